//! callprobe common library
//!
//! Data model, error taxonomy and configuration shared by the callprobe
//! client library and CLI.

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{CallApiConfig, ClientConfig, TwilioConfig};
pub use error::{Error, Result};
pub use types::*;

/// callprobe version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
