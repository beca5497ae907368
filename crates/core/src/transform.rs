//! Per-frame transform engine
//!
//! A [`Transform`] is a pure function over one raw frame: pixel data in,
//! pixel data out, same geometry, same timing metadata. There is no state
//! here, so one engine value can serve frames from any number of sessions
//! concurrently.
//!
//! Selector parsing is deliberately permissive: unknown names behave like
//! `none` instead of failing, matching the signaling boundary where the
//! transform field is free text.

use crate::frame::VideoFrame;
use serde::{Deserialize, Serialize};

/// Hysteresis thresholds for the edge operator, on the 8-bit intensity scale
const EDGE_LOW_THRESHOLD: u32 = 100;
const EDGE_HIGH_THRESHOLD: u32 = 200;

/// Named per-frame transform applied to a video track before re-transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    /// Pass frames through unchanged
    #[default]
    None,
    /// Convert to luminance, re-expanded to the original channel count
    Grayscale,
    /// Edge map with fixed 100/200 hysteresis, re-expanded to the original
    /// channel count
    Edge,
}

impl Transform {
    /// Parse a transform selector by name
    ///
    /// Unknown selectors (including the empty string) fall back to
    /// [`Transform::None`] rather than erroring, so a client sending an
    /// unexpected name gets its video echoed back untouched.
    pub fn from_name(name: &str) -> Self {
        match name {
            "grayscale" => Transform::Grayscale,
            "edge" => Transform::Edge,
            _ => Transform::None,
        }
    }

    /// Canonical selector name
    pub fn as_str(&self) -> &'static str {
        match self {
            Transform::None => "none",
            Transform::Grayscale => "grayscale",
            Transform::Edge => "edge",
        }
    }

    /// Apply this transform to one frame
    ///
    /// The output always has the input's dimensions, pixel format, pts and
    /// time base. Only pixel data may differ.
    pub fn apply(&self, frame: &VideoFrame) -> VideoFrame {
        match self {
            Transform::None => frame.clone(),
            Transform::Grayscale => grayscale(frame),
            Transform::Edge => edge(frame),
        }
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integer BT.601 luma for one BGR pixel
///
/// Weights sum to exactly 1000, so a pixel with equal channels maps to
/// itself and grayscale is idempotent on already-gray data.
#[inline]
fn luma(b: u8, g: u8, r: u8) -> u8 {
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8
}

/// Single-channel luminance plane from an interleaved BGR buffer
fn luma_plane(frame: &VideoFrame) -> Vec<u8> {
    frame
        .data
        .chunks_exact(frame.format.channels())
        .map(|px| luma(px[0], px[1], px[2]))
        .collect()
}

/// Replicate a single-channel plane across the frame's channel count
fn expand_plane(frame: &VideoFrame, plane: &[u8]) -> VideoFrame {
    let channels = frame.format.channels();
    let mut data = Vec::with_capacity(plane.len() * channels);
    for &v in plane {
        for _ in 0..channels {
            data.push(v);
        }
    }
    // Geometry is unchanged, so this cannot fail.
    frame
        .with_data(data)
        .expect("expanded plane matches frame geometry")
}

fn grayscale(frame: &VideoFrame) -> VideoFrame {
    let plane = luma_plane(frame);
    expand_plane(frame, &plane)
}

fn edge(frame: &VideoFrame) -> VideoFrame {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let plane = luma_plane(frame);
    let smoothed = gaussian_blur3(&plane, width, height);
    let magnitude = sobel_magnitude(&smoothed, width, height);
    let edges = hysteresis(&magnitude, width, height);
    expand_plane(frame, &edges)
}

/// Clamp a pixel coordinate offset to the plane, replicating borders
#[inline]
fn clamped(plane: &[u8], width: usize, height: usize, x: isize, y: isize) -> u32 {
    let x = x.clamp(0, width as isize - 1) as usize;
    let y = y.clamp(0, height as isize - 1) as usize;
    plane[y * width + x] as u32
}

/// 3x3 Gaussian smoothing (kernel 1-2-1 / 2-4-2 / 1-2-1, normalized by 16)
fn gaussian_blur3(plane: &[u8], width: usize, height: usize) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let mut out = vec![0u8; plane.len()];
    for y in 0..height as isize {
        for x in 0..width as isize {
            let mut acc = 0u32;
            const KERNEL: [[u32; 3]; 3] = [[1, 2, 1], [2, 4, 2], [1, 2, 1]];
            for (ky, row) in KERNEL.iter().enumerate() {
                for (kx, &k) in row.iter().enumerate() {
                    acc += k * clamped(plane, width, height, x + kx as isize - 1, y + ky as isize - 1);
                }
            }
            out[y as usize * width + x as usize] = (acc / 16) as u8;
        }
    }
    out
}

/// Sobel gradient magnitude (|gx| + |gy| approximation, clamped to 255)
fn sobel_magnitude(plane: &[u8], width: usize, height: usize) -> Vec<u32> {
    let mut out = vec![0u32; plane.len()];
    for y in 0..height as isize {
        for x in 0..width as isize {
            let p = |dx: isize, dy: isize| clamped(plane, width, height, x + dx, y + dy) as i32;
            let gx = -p(-1, -1) - 2 * p(-1, 0) - p(-1, 1) + p(1, -1) + 2 * p(1, 0) + p(1, 1);
            let gy = -p(-1, -1) - 2 * p(0, -1) - p(1, -1) + p(-1, 1) + 2 * p(0, 1) + p(1, 1);
            out[y as usize * width + x as usize] = (gx.unsigned_abs() + gy.unsigned_abs()).min(255);
        }
    }
    out
}

/// Double-threshold hysteresis over a gradient magnitude plane
///
/// Pixels at or above the high threshold are edges; pixels between the two
/// thresholds survive only if 8-connected (transitively) to a strong pixel.
/// Output is a binary 0/255 plane.
fn hysteresis(magnitude: &[u32], width: usize, height: usize) -> Vec<u8> {
    let mut edges = vec![0u8; magnitude.len()];
    let mut stack = Vec::new();

    for (i, &m) in magnitude.iter().enumerate() {
        if m >= EDGE_HIGH_THRESHOLD {
            edges[i] = 255;
            stack.push(i);
        }
    }

    // Flood weak pixels reachable from strong ones.
    while let Some(i) = stack.pop() {
        let x = (i % width) as isize;
        let y = (i / width) as isize;
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                    continue;
                }
                let n = ny as usize * width + nx as usize;
                if edges[n] == 0 && magnitude[n] >= EDGE_LOW_THRESHOLD {
                    edges[n] = 255;
                    stack.push(n);
                }
            }
        }
    }

    edges
}
