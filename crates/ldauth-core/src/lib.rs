//! Ldauth Core Library
//!
//! Configuration and error types shared by the ldauth authentication bridge.

pub mod config;
pub mod error;

pub use config::LdauthConfig;
pub use error::{Error, Result};

/// Ldauth version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default port for the HTTP auth listener
pub const DEFAULT_PORT: u16 = 5000;
