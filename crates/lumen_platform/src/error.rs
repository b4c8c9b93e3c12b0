//! Platform error types

use thiserror::Error;

/// Errors reported by a native GL platform
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Failed to load a native library or open the display connection
    #[error("Platform initialization failed: {0}")]
    InitFailed(String),

    /// A query against the display server failed
    #[error("Display query failed: {0}")]
    Query(String),

    /// The driver refused to create a resource
    #[error("Native resource creation failed: {0}")]
    Creation(String),

    /// Binding or unbinding a context failed
    #[error("Failed to change current context: {0}")]
    Binding(String),

    /// Operation not supported by this platform
    #[error("Platform not supported: {0}")]
    Unsupported(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
