//! Video codec boundary
//!
//! Encode/decode internals are an external collaborator: the session layer
//! only needs something that turns RTP payloads into raw frames and raw
//! frames back into track samples. Real codec backends plug in behind
//! [`VideoDecoder`] / [`VideoEncoder`]; [`RawCodec`] is the trivial
//! both-ways implementation used by the default wiring and the tests.

use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use framepipe_core::{PixelFormat, TimeBase, VideoFrame};
use std::time::Duration;

/// One encoded unit ready to be written as an outbound track sample
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    /// Encoded payload bytes
    pub data: Bytes,
    /// Display duration of the sample
    pub duration: Duration,
}

/// Decoder half of the codec collaborator
///
/// Fed one RTP payload at a time; yields a frame once enough payload has
/// accumulated. Stateful per track, so each pipe gets its own instance.
pub trait VideoDecoder: Send {
    /// Consume one RTP payload
    ///
    /// Returns `Ok(None)` while a frame is still incomplete.
    fn decode(&mut self, payload: &[u8], rtp_timestamp: u32) -> Result<Option<VideoFrame>>;
}

/// Encoder half of the codec collaborator
pub trait VideoEncoder: Send {
    /// Encode one raw frame into a track sample payload
    fn encode(&mut self, frame: &VideoFrame) -> Result<EncodedChunk>;
}

/// Factory handed to the negotiator so every track pipe gets fresh
/// decoder/encoder state
pub trait CodecFactory: Send + Sync {
    /// New decoder for one inbound track
    fn new_decoder(&self) -> Box<dyn VideoDecoder>;
    /// New encoder for one outbound track
    fn new_encoder(&self) -> Box<dyn VideoEncoder>;
}

/// Nominal frame duration stamped on raw samples (30 fps)
const RAW_FRAME_DURATION: Duration = Duration::from_nanos(1_000_000_000 / 30);

/// Byte length of the raw payload header: width and height as u32 BE
const RAW_HEADER_LEN: usize = 8;

/// Trivial codec: frames travel as raw BGR buffers behind a tiny
/// width/height header, one frame per payload
///
/// Exists so the pipeline is fully wired end to end without pulling codec
/// internals into scope. A VP8/H264 backend replaces this behind the same
/// traits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl VideoDecoder for RawCodec {
    fn decode(&mut self, payload: &[u8], rtp_timestamp: u32) -> Result<Option<VideoFrame>> {
        if payload.len() < RAW_HEADER_LEN {
            return Err(Error::Codec(format!(
                "raw payload too short: {} bytes",
                payload.len()
            )));
        }
        let width = u32::from_be_bytes(payload[0..4].try_into().expect("4-byte slice"));
        let height = u32::from_be_bytes(payload[4..8].try_into().expect("4-byte slice"));
        let frame = VideoFrame::new(
            payload[RAW_HEADER_LEN..].to_vec(),
            width,
            height,
            PixelFormat::Bgr24,
            rtp_timestamp as i64,
            TimeBase::VIDEO_90KHZ,
        )
        .map_err(|e| Error::Codec(format!("raw payload malformed: {e}")))?;
        Ok(Some(frame))
    }
}

impl VideoEncoder for RawCodec {
    fn encode(&mut self, frame: &VideoFrame) -> Result<EncodedChunk> {
        let mut buf = BytesMut::with_capacity(RAW_HEADER_LEN + frame.data.len());
        buf.put_u32(frame.width);
        buf.put_u32(frame.height);
        buf.extend_from_slice(&frame.data);
        Ok(EncodedChunk {
            data: buf.freeze(),
            duration: RAW_FRAME_DURATION,
        })
    }
}

impl CodecFactory for RawCodec {
    fn new_decoder(&self) -> Box<dyn VideoDecoder> {
        Box::new(*self)
    }

    fn new_encoder(&self) -> Box<dyn VideoEncoder> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codec_round_trips_a_frame() {
        let frame = VideoFrame::new(
            vec![42u8; 4 * 3 * 3],
            4,
            3,
            PixelFormat::Bgr24,
            1234,
            TimeBase::VIDEO_90KHZ,
        )
        .unwrap();

        let mut codec = RawCodec;
        let chunk = codec.encode(&frame).unwrap();
        let decoded = codec.decode(&chunk.data, 1234).unwrap().unwrap();
        assert_eq!(decoded.data, frame.data);
        assert_eq!(decoded.width, 4);
        assert_eq!(decoded.height, 3);
        assert_eq!(decoded.pts, 1234);
    }

    #[test]
    fn truncated_payload_is_a_codec_error() {
        let mut codec = RawCodec;
        assert!(codec.decode(&[1, 2, 3], 0).is_err());

        // Header claims more pixels than the payload carries.
        let mut buf = BytesMut::new();
        buf.put_u32(100);
        buf.put_u32(100);
        buf.extend_from_slice(&[0u8; 16]);
        assert!(codec.decode(&buf, 0).is_err());
    }
}
