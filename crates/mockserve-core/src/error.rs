//! Error types for MockServe.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Timed out after {elapsed:?} waiting for token {token}")]
    Timeout { token: String, elapsed: Duration },

    #[error("A wait is already pending for token {0}")]
    DuplicateWait(String),

    #[error("Completion slot closed for token {0}")]
    Closed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
