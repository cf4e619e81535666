//! # Clip Normalizer
//!
//! Cut timecoded clips out of source videos and normalize them for dataset use:
//! fixed frame rate, square letterboxed frames and a fixed audio sample rate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clip_normalizer::{
//!     backend::FfmpegBackend,
//!     clip::{ClipNormalizer, ClipRequest},
//!     config::Config,
//! };
//!
//! let config = Config::default();
//! let normalizer = ClipNormalizer::new(FfmpegBackend::new(config.encoder.clone()));
//!
//! let request = ClipRequest::new("download_video/abc123.mp4", "0:00:05", "0:00:12", "clips/abc123.mp4")
//!     .with_targets(config.clip.targets());
//!
//! let result = normalizer.clip(&request);
//! if !result.success {
//!     eprintln!("{}", result.error_message().unwrap_or("unknown error"));
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`timecode`] - `H:MM:SS(.fff)` and bare-seconds parsing
//! - [`video`] - frames, media info, probing and the resize-and-pad transform
//! - [`backend`] - the decode/encode seam and its ffmpeg implementation
//! - [`clip`] - the per-clip pipeline
//! - [`table`] - clip tables and output naming
//! - [`config`] - configuration management
//!
//! ## Custom Backends
//!
//! The pipeline only talks to media tooling through the [`Backend`](backend::Backend)
//! trait, so it can be driven by anything that can hand out RGB24 frames:
//!
//! ```rust,no_run
//! use std::path::Path;
//! use clip_normalizer::backend::{AudioJob, Backend, DecodeJob, EncodeJob, FrameReader, FrameWriter};
//! use clip_normalizer::error::ClipError;
//! use clip_normalizer::video::MediaInfo;
//!
//! struct MyBackend;
//!
//! impl Backend for MyBackend {
//!     fn probe(&self, path: &Path) -> Result<MediaInfo, ClipError> {
//!         todo!()
//!     }
//!
//!     fn decode(&self, job: &DecodeJob) -> Result<Box<dyn FrameReader>, ClipError> {
//!         todo!()
//!     }
//!
//!     fn extract_audio(&self, job: &AudioJob, scratch: &Path) -> Result<(), ClipError> {
//!         todo!()
//!     }
//!
//!     fn encode(&self, job: &EncodeJob) -> Result<Box<dyn FrameWriter>, ClipError> {
//!         todo!()
//!     }
//! }
//! ```

pub mod backend;
pub mod clip;
pub mod config;
pub mod error;
pub mod table;
pub mod timecode;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    backend::{Backend, FfmpegBackend},
    clip::{ClipNormalizer, ClipRequest, ClipResult, ClipTargets},
    config::Config,
    error::{ClipError, NormalizerError, Result},
    timecode::{parse_time, TimeSpec},
};
