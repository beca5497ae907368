//! Track pipe: one transformed frame source over one upstream track
//!
//! A [`TrackPipe`] adapts an upstream [`FrameSource`] into a transformed
//! frame source, strictly one frame per pull. There is no buffering and no
//! read-ahead; backpressure is whatever the caller's demand is. Frames come
//! out in the order they went in, carrying the upstream pts and time base
//! untouched (the transform engine rewrites pixel data only).

use async_trait::async_trait;
use framepipe_core::{Transform, VideoFrame};
use thiserror::Error;

/// Terminal conditions a frame source can report
#[derive(Debug, Error)]
pub enum TrackError {
    /// Upstream signalled end-of-stream
    #[error("track ended")]
    Ended,

    /// Upstream transport failed
    #[error("track transport error: {0}")]
    Transport(String),
}

/// An on-demand source of raw video frames
///
/// `next()` suspends until the upstream produces a frame. End-of-stream and
/// transport failures propagate to the caller; a source never fabricates
/// frames to paper over either.
#[async_trait]
pub trait FrameSource: Send {
    /// Pull the next frame from upstream
    async fn next(&mut self) -> std::result::Result<VideoFrame, TrackError>;
}

/// One inbound track wrapped with a fixed per-frame transform
pub struct TrackPipe<S> {
    source: S,
    transform: Transform,
}

impl<S: FrameSource> TrackPipe<S> {
    /// Wrap an upstream source with the given transform
    ///
    /// The transform is copied from the owning session at creation and is
    /// immutable for the pipe's lifetime.
    pub fn new(source: S, transform: Transform) -> Self {
        Self { source, transform }
    }

    /// Transform this pipe applies
    pub fn transform(&self) -> Transform {
        self.transform
    }
}

#[async_trait]
impl<S: FrameSource> FrameSource for TrackPipe<S> {
    async fn next(&mut self) -> std::result::Result<VideoFrame, TrackError> {
        let frame = self.source.next().await?;
        // Pass-through keeps the upstream buffer; only real transforms
        // allocate an output frame.
        match self.transform {
            Transform::None => Ok(frame),
            transform => Ok(transform.apply(&frame)),
        }
    }
}
