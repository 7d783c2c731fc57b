//! Retrying HTTP session used to download article pages.

mod session;

pub use session::{RetryPolicy, RetrySession};
