//! Adapters between the WebRTC engine's tracks and the frame pipeline
//!
//! [`RtpFrameSource`] turns a remote track plus a decoder collaborator into
//! a [`FrameSource`]; [`spawn_sender_pump`] drives a pipe's output through
//! an encoder into an outbound sample track.

use crate::media::codec::{VideoDecoder, VideoEncoder};
use crate::media::pipe::{FrameSource, TrackError, TrackPipe};
use crate::session::SessionId;
use async_trait::async_trait;
use framepipe_core::VideoFrame;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use webrtc::media::Sample;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

/// Frame source over one remote track
///
/// Reads RTP packets off the engine-owned track and feeds them to the
/// decoder until a frame comes out. The track itself stays owned by the
/// negotiation engine; this only holds a shared handle.
pub struct RtpFrameSource {
    track: Arc<TrackRemote>,
    decoder: Box<dyn VideoDecoder>,
}

impl RtpFrameSource {
    /// Wrap a remote track with a fresh decoder
    pub fn new(track: Arc<TrackRemote>, decoder: Box<dyn VideoDecoder>) -> Self {
        Self { track, decoder }
    }
}

#[async_trait]
impl FrameSource for RtpFrameSource {
    async fn next(&mut self) -> std::result::Result<VideoFrame, TrackError> {
        loop {
            // A read error means the transport went away or the track
            // ended; either way the stream is over for this pipe.
            let (packet, _attributes) = match self.track.read_rtp().await {
                Ok(read) => read,
                Err(e) => {
                    debug!(track_id = %self.track.id(), "RTP read ended: {e}");
                    return Err(TrackError::Ended);
                }
            };

            match self.decoder.decode(&packet.payload, packet.header.timestamp) {
                Ok(Some(frame)) => return Ok(frame),
                Ok(None) => continue,
                Err(e) => {
                    // One bad payload does not end the track.
                    warn!(track_id = %self.track.id(), "dropping undecodable payload: {e}");
                    continue;
                }
            }
        }
    }
}

/// Spawn the task that pumps one pipe into one outbound track
///
/// Runs until the pipe reports end-of-stream or a transport error, or the
/// outbound track stops accepting samples. Ending the pump ends only the
/// outbound stream; session teardown is the state machine's job.
pub fn spawn_sender_pump<S>(
    session_id: SessionId,
    mut pipe: TrackPipe<S>,
    mut encoder: Box<dyn VideoEncoder>,
    out_track: Arc<TrackLocalStaticSample>,
) -> JoinHandle<()>
where
    S: FrameSource + 'static,
{
    tokio::spawn(async move {
        loop {
            let frame = match pipe.next().await {
                Ok(frame) => frame,
                Err(TrackError::Ended) => {
                    info!(session = %session_id, "inbound track ended, stopping outbound pump");
                    break;
                }
                Err(TrackError::Transport(e)) => {
                    warn!(session = %session_id, "inbound track transport error: {e}");
                    break;
                }
            };

            let chunk = match encoder.encode(&frame) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(session = %session_id, "skipping unencodable frame: {e}");
                    continue;
                }
            };

            let sample = Sample {
                data: chunk.data,
                duration: chunk.duration,
                ..Default::default()
            };
            if let Err(e) = out_track.write_sample(&sample).await {
                debug!(session = %session_id, "outbound track rejected sample, stopping pump: {e}");
                break;
            }
        }
    })
}
