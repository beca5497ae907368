//! Outbound pump behavior around upstream termination
//!
//! The pump forwarding a track pipe into the outbound track must stop on
//! upstream end-of-stream without taking anything else down with it.

use async_trait::async_trait;
use framepipe_core::{PixelFormat, TimeBase, Transform, VideoFrame};
use framepipe_webrtc::media::{spawn_sender_pump, FrameSource, RawCodec, TrackError, TrackPipe};
use framepipe_webrtc::{CodecFactory, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

struct ChannelSource(mpsc::Receiver<Result<VideoFrame, TrackError>>);

#[async_trait]
impl FrameSource for ChannelSource {
    async fn next(&mut self) -> Result<VideoFrame, TrackError> {
        self.0.recv().await.unwrap_or(Err(TrackError::Ended))
    }
}

fn test_frame(pts: i64) -> VideoFrame {
    VideoFrame::new(
        vec![99u8; 4 * 4 * 3],
        4,
        4,
        PixelFormat::Bgr24,
        pts,
        TimeBase::VIDEO_90KHZ,
    )
    .unwrap()
}

fn unbound_out_track() -> Arc<TrackLocalStaticSample> {
    Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            ..Default::default()
        },
        "pump-test".to_owned(),
        "framepipe".to_owned(),
    ))
}

#[tokio::test]
async fn pump_stops_on_upstream_end_of_stream() {
    let (tx, rx) = mpsc::channel(4);
    let pipe = TrackPipe::new(ChannelSource(rx), Transform::Grayscale);
    let pump = spawn_sender_pump(
        SessionId::new(),
        pipe,
        RawCodec.new_encoder(),
        unbound_out_track(),
    );

    tx.send(Ok(test_frame(0))).await.unwrap();
    tx.send(Ok(test_frame(3000))).await.unwrap();
    drop(tx); // upstream ends

    tokio::time::timeout(Duration::from_secs(2), pump)
        .await
        .expect("pump should stop once upstream ends")
        .expect("pump task must not panic");
}

#[tokio::test]
async fn pump_stops_on_upstream_transport_error() {
    let (tx, rx) = mpsc::channel(1);
    let pipe = TrackPipe::new(ChannelSource(rx), Transform::None);
    let pump = spawn_sender_pump(
        SessionId::new(),
        pipe,
        RawCodec.new_encoder(),
        unbound_out_track(),
    );

    tx.send(Err(TrackError::Transport("dtls teardown".into())))
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), pump)
        .await
        .expect("pump should stop on transport error")
        .expect("pump task must not panic");
}
