//! Error types for meshbench.

use crate::gfx::GraphicsError;
use thiserror::Error;

/// Main error type for benchmark operations.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("invalid configuration: {triangles} triangles yields no surface subdivision")]
    InvalidConfiguration { triangles: u32 },

    #[error("unsupported capability: {0}")]
    UnsupportedCapability(&'static str),

    #[error("graphics error: {0}")]
    Graphics(#[from] GraphicsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for benchmark operations.
pub type Result<T> = std::result::Result<T, BenchError>;
