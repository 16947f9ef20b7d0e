//! payflow common library
//!
//! The status convergence primitive used by the payflow suites to wait for
//! asynchronous backend transitions.

pub mod error;
pub mod poll;

pub use error::{Error, Result};
pub use poll::{from_fn, poll, FnSource, PollConfig, PollOutcome, StatusPoller, StatusSource};

/// payflow version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
