use std::path::PathBuf;

use thiserror::Error;

/// gbampy error types
#[derive(Error, Debug)]
pub enum GbaError {
    /// No valid reserved filesystem region in the ROM, or its geometry is unset
    #[error("MicroPython ROM for GBA is invalid: {reason}")]
    ContainerInvalid { reason: String },

    /// The ROM has no formatted filesystem to write back
    #[error("The LittleFS file system in the ROM is not formatted")]
    FilesystemNotFormatted,

    /// Formatting or mounting the embedded filesystem failed
    #[error("Failed to format LittleFS file system: {message}")]
    FilesystemFormatError { message: String },

    /// The embedded filesystem rejected a directory or file operation
    #[error("LittleFS I/O error at {path}: {cause}")]
    FilesystemIoError { path: String, cause: String },

    /// The in-memory block device does not match the reserved region size
    #[error("Block device buffer is {actual} bytes, reserved region holds {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// A host path outside the project source directory was mapped
    #[error("Path '{}' is outside the project source directory '{}'", .path.display(), .root.display())]
    OutOfScopePath { path: PathBuf, root: PathBuf },

    /// An external program could not be located
    #[error("'{tool}' not found, please make sure it is in your PATH or configured")]
    ExternalToolNotFound { tool: String },

    /// The cross-compiler rejected a script
    #[error("Failed to compile: {}\nCompiling output:\n{diagnostics}", .script.display())]
    CompileError { script: PathBuf, diagnostics: String },

    /// An input file does not exist
    #[error("File '{}' does not exist", .path.display())]
    SourceNotFound { path: PathBuf },

    /// A hook specification is not of the form `module:function`
    #[error("Invalid hook '{spec}': expected 'module:function'")]
    InvalidHook { spec: String },

    /// A configured hook could not be resolved
    #[error("Hook '{hook}' not found: {reason}")]
    HookNotFound { hook: String, reason: String },

    /// A hook ran and reported failure
    #[error("Hook '{hook}' failed: {reason}")]
    HookFailed { hook: String, reason: String },

    /// A host file name that cannot be stored in the image
    #[error("Path '{path}' is not valid UTF-8")]
    NonUtf8Path { path: PathBuf },

    /// An ignore pattern is not a valid glob
    #[error("Invalid ignore pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serde_json::Error> for GbaError {
    fn from(err: serde_json::Error) -> Self {
        GbaError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for GbaError {
    fn from(err: toml::de::Error) -> Self {
        GbaError::ConfigError(err.to_string())
    }
}

/// Result type alias for gbampy operations
pub type Result<T> = std::result::Result<T, GbaError>;
