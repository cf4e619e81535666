//! # Clip Normalization
//!
//! Turns a `(source, start, end)` request into a trimmed, resampled and
//! letterboxed MP4.

pub mod normalizer;
pub mod types;

pub use normalizer::ClipNormalizer;
pub use types::{ClipFailure, ClipRequest, ClipResult, ClipTargets, ClipWarning, TimeRange};
