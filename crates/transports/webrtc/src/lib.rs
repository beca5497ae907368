//! WebRTC session layer for FramePipe
//!
//! Owns everything between the signaling boundary and the frame transform
//! engine: peer connection negotiation, per-session lifecycle state, the
//! process-wide session registry, and the track pipes that pull frames off
//! an inbound track, transform them, and push them back out.
//!
//! The negotiation engine's callbacks are not acted on in place; they only
//! forward [`session::SessionEvent`]s into a channel that each session's own
//! task consumes. That keeps lifecycle handling in one straight-line loop
//! per session instead of scattered re-entrant closures.

pub mod config;
pub mod error;
pub mod media;
pub mod session;

pub use config::WebRtcConfig;
pub use error::{Error, Result};
pub use media::{
    CodecFactory, EncodedChunk, FrameSource, RawCodec, TrackError, TrackPipe, VideoDecoder,
    VideoEncoder,
};
pub use session::{
    AnswerDescription, Negotiator, Session, SessionEvent, SessionId, SessionRegistry, SessionState,
};
