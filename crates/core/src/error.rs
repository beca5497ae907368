//! Error types for FramePipe core

use thiserror::Error;

/// Result type alias for FramePipe core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the FramePipe core
#[derive(Debug, Error)]
pub enum Error {
    /// Frame buffer does not match the declared geometry
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}
