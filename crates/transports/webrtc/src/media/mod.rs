//! Media plumbing: codec boundary, track pipes, RTP adapters
//!
//! Codec internals are a collaborator behind the [`VideoDecoder`] and
//! [`VideoEncoder`] traits; this module only moves frames between the
//! negotiation engine's tracks and the transform engine.

pub mod codec;
pub mod pipe;
pub mod rtp_source;

pub use codec::{CodecFactory, EncodedChunk, RawCodec, VideoDecoder, VideoEncoder};
pub use pipe::{FrameSource, TrackError, TrackPipe};
pub use rtp_source::{spawn_sender_pump, RtpFrameSource};
