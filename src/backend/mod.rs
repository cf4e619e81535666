//! # Decode/Encode Backend
//!
//! The clip pipeline only orchestrates; opening, decoding, resampling and
//! encoding media is delegated to a [`Backend`]. Frames travel between the
//! backend and the pipeline one at a time so a clip never has to be held in
//! memory as a whole.

pub mod ffmpeg;

use std::path::{Path, PathBuf};

use crate::clip::TimeRange;
use crate::error::ClipError;
use crate::video::{Frame, MediaInfo};

pub use self::ffmpeg::FfmpegBackend;

/// Video frames of one source range
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeJob {
    pub source: PathBuf,
    pub range: TimeRange,
    /// Resample to this rate; `None` keeps the source timing
    pub fps: Option<f64>,
    /// Decoded frame width (display orientation)
    pub width: u32,
    /// Decoded frame height (display orientation)
    pub height: u32,
}

/// Audio of one source range, written as 16-bit PCM WAV
#[derive(Debug, Clone, PartialEq)]
pub struct AudioJob {
    pub source: PathBuf,
    pub range: TimeRange,
    /// Resample to this rate; `None` keeps the source rate
    pub sample_rate: Option<u32>,
}

/// Frames in, one MP4 file out
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// WAV file to mux in as the audio track
    pub audio: Option<PathBuf>,
}

/// Pulls decoded RGB frames
pub trait FrameReader {
    /// Next frame, or `None` once the range is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame>, ClipError>;

    /// Wait for the decoder and surface any error it reported
    fn finish(self: Box<Self>) -> Result<(), ClipError>;
}

/// Pushes RGB frames into an encoder
pub trait FrameWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), ClipError>;

    /// Flush and close the output file
    fn finish(self: Box<Self>) -> Result<(), ClipError>;
}

/// Primitive media operations the clip pipeline is built from
///
/// Readers and writers that are dropped without `finish` must release
/// whatever they hold (processes, file handles) on drop.
pub trait Backend {
    /// Duration, video geometry and audio layout of a file
    fn probe(&self, path: &Path) -> Result<MediaInfo, ClipError>;

    fn decode(&self, job: &DecodeJob) -> Result<Box<dyn FrameReader>, ClipError>;

    /// Write the audio of `job` into `scratch`
    fn extract_audio(&self, job: &AudioJob, scratch: &Path) -> Result<(), ClipError>;

    fn encode(&self, job: &EncodeJob) -> Result<Box<dyn FrameWriter>, ClipError>;
}
