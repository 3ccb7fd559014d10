//! gbampy Core - Foundational Types
//!
//! Configuration model and error taxonomy shared by the gbampy engine
//! and command line front end.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{ProjectConfig, DEFAULT_CONFIG_FILENAME};
pub use error::{GbaError, Result};

/// gbampy version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
