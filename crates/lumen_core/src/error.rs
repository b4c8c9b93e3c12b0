//! Context error types

use thiserror::Error;

/// Errors raised while negotiating, creating or activating a context
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// The platform format query failed or offered nothing for the surface
    #[error("Pixel format enumeration failed: {0}")]
    Enumeration(String),

    /// Every antialiasing level was tried without finding an eligible format
    #[error("No suitable pixel format (antialiasing levels tried: {attempted:?})")]
    NoSuitableFormat {
        /// Antialiasing levels visited by the fallback ladder, in order
        attempted: Vec<u32>,
    },

    /// The driver refused to create the context or one of its resources
    #[error("Native context creation failed: {0}")]
    NativeCreation(String),

    /// Binding or unbinding the context failed
    #[error("Context activation failed: {0}")]
    Activation(String),
}

/// Result type for context operations
pub type Result<T> = std::result::Result<T, ContextError>;
