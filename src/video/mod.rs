//! # Video Module
//!
//! Frame representation, the letterbox transform, and media probing.

pub mod probe;
pub mod transform;
pub mod types;

pub use transform::{resize_and_pad, Letterbox};
pub use types::{AudioStreamInfo, Frame, MediaInfo, VideoStreamInfo};
