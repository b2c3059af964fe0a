//! MockServe Core — configuration and shared error types.

pub mod config;
pub mod error;

pub use config::{BatchSettings, MockServeConfig};
pub use error::{Error, Result};
