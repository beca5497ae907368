//! Error types for the FramePipe WebRTC session layer

use thiserror::Error;

/// Result type alias for session-layer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the session layer
#[derive(Debug, Error)]
pub enum Error {
    /// Offer/answer exchange failed; surfaced to the signaling caller
    #[error("Negotiation error: {0}")]
    Negotiation(String),

    /// Error reported by the underlying WebRTC engine
    #[error("WebRTC error: {0}")]
    WebRtc(String),

    /// Codec collaborator failed to encode or decode
    #[error("Codec error: {0}")]
    Codec(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}
