//! Raw video frame representation
//!
//! A [`VideoFrame`] is one decoded unit of video: an interleaved pixel
//! buffer plus the presentation timestamp and time base it arrived with.
//! Transforms may rewrite pixel data but must carry pts and time base
//! through unchanged.

use crate::{Error, Result};

/// Pixel layout of a raw frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Interleaved 8-bit blue/green/red, 3 bytes per pixel
    Bgr24,
}

impl PixelFormat {
    /// Number of interleaved channels per pixel
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Bgr24 => 3,
        }
    }

    /// Buffer size in bytes for a frame of the given dimensions
    pub fn bytes_per_frame(&self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.channels()
    }
}

/// Rational time base for frame timestamps (e.g. 1/90000 for video)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeBase {
    /// Numerator
    pub num: u32,
    /// Denominator
    pub den: u32,
}

impl TimeBase {
    /// The 90 kHz clock conventionally used for RTP video
    pub const VIDEO_90KHZ: TimeBase = TimeBase { num: 1, den: 90_000 };

    /// Create a time base from a numerator/denominator pair
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }
}

/// One raw video frame with its timing metadata
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Interleaved pixel data, row-major
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel layout of `data`
    pub format: PixelFormat,
    /// Presentation timestamp in `time_base` units
    pub pts: i64,
    /// Clock the pts is expressed in
    pub time_base: TimeBase,
}

impl VideoFrame {
    /// Create a frame, validating that the buffer matches the geometry
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        pts: i64,
        time_base: TimeBase,
    ) -> Result<Self> {
        let expected = format.bytes_per_frame(width, height);
        if data.len() != expected {
            return Err(Error::InvalidFrame(format!(
                "buffer is {} bytes, expected {} for {}x{} {:?}",
                data.len(),
                expected,
                width,
                height,
                format
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            pts,
            time_base,
        })
    }

    /// Build an output frame that reuses this frame's geometry and timing
    /// but carries new pixel data. Used by transforms so pts/time_base can
    /// never drift from the input.
    pub fn with_data(&self, data: Vec<u8>) -> Result<Self> {
        Self::new(
            data,
            self.width,
            self.height,
            self.format,
            self.pts,
            self.time_base,
        )
    }

    /// Number of pixels in the frame
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_geometry_is_validated() {
        let ok = VideoFrame::new(
            vec![0u8; 4 * 2 * 3],
            4,
            2,
            PixelFormat::Bgr24,
            0,
            TimeBase::VIDEO_90KHZ,
        );
        assert!(ok.is_ok());

        let short = VideoFrame::new(
            vec![0u8; 10],
            4,
            2,
            PixelFormat::Bgr24,
            0,
            TimeBase::VIDEO_90KHZ,
        );
        assert!(matches!(short, Err(Error::InvalidFrame(_))));
    }

    #[test]
    fn with_data_preserves_timing() {
        let frame = VideoFrame::new(
            vec![7u8; 2 * 2 * 3],
            2,
            2,
            PixelFormat::Bgr24,
            12345,
            TimeBase::new(1, 30),
        )
        .unwrap();

        let out = frame.with_data(vec![0u8; 2 * 2 * 3]).unwrap();
        assert_eq!(out.pts, 12345);
        assert_eq!(out.time_base, TimeBase::new(1, 30));
        assert_eq!(out.width, 2);
        assert_eq!(out.height, 2);
    }
}
