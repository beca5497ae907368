//! Core data model for FramePipe
//!
//! Contains the raw video frame representation and the per-frame transform
//! engine. Everything here is pure and synchronous: no I/O, no async, no
//! shared state. Transport crates own the plumbing that feeds frames in and
//! out.

pub mod error;
pub mod frame;
pub mod transform;

pub use error::{Error, Result};
pub use frame::{PixelFormat, TimeBase, VideoFrame};
pub use transform::Transform;
