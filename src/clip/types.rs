use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ClipError, ClipErrorKind};
use crate::timecode::TimeSpec;

/// A resolved `[start, end)` range in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    /// Validate a requested range against the source duration
    ///
    /// A start at or past the end of the source is rejected. An end past the
    /// source is pulled back to the duration and reported as a warning. A range
    /// that is empty after that adjustment is rejected.
    pub fn resolve(start: f64, end: f64, duration: f64) -> Result<(Self, Option<ClipWarning>), ClipError> {
        if start >= duration {
            return Err(ClipError::InvalidRange { start, end, duration });
        }

        let mut warning = None;
        let mut clamped_end = end;
        if end > duration {
            warning = Some(ClipWarning::EndClamped { requested: end, duration });
            clamped_end = duration;
        }

        if clamped_end <= start {
            return Err(ClipError::InvalidRange { start, end, duration });
        }

        Ok((Self { start, end: clamped_end }, warning))
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Output parameters for a clip; `None` leaves that property as the source has it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipTargets {
    /// Output frame rate
    pub fps: Option<f64>,
    /// Side of the square output canvas in pixels
    pub size: Option<u32>,
    /// Output audio sample rate in Hz
    pub sample_rate: Option<u32>,
}

impl ClipTargets {
    /// Keep the source frame rate, size and sample rate
    pub fn passthrough() -> Self {
        Self { fps: None, size: None, sample_rate: None }
    }
}

impl Default for ClipTargets {
    fn default() -> Self {
        Self {
            fps: Some(24.0),
            size: Some(768),
            sample_rate: Some(16000),
        }
    }
}

/// One clip to cut out of a source video
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRequest {
    pub source_path: PathBuf,
    pub start: TimeSpec,
    pub end: TimeSpec,
    pub output_path: PathBuf,
    pub targets: ClipTargets,
}

impl ClipRequest {
    pub fn new<S, O>(source_path: S, start: impl Into<TimeSpec>, end: impl Into<TimeSpec>, output_path: O) -> Self
    where
        S: Into<PathBuf>,
        O: Into<PathBuf>,
    {
        Self {
            source_path: source_path.into(),
            start: start.into(),
            end: end.into(),
            output_path: output_path.into(),
            targets: ClipTargets::default(),
        }
    }

    pub fn with_targets(mut self, targets: ClipTargets) -> Self {
        self.targets = targets;
        self
    }
}

/// Recoverable adjustments made while processing a clip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ClipWarning {
    /// The requested end ran past the source and was cut back to its duration
    EndClamped { requested: f64, duration: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipFailure {
    pub kind: ClipErrorKind,
    pub message: String,
}

/// Outcome of a single [`ClipRequest`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipResult {
    pub success: bool,
    pub output_path: PathBuf,
    /// Present iff `success` is false
    pub error: Option<ClipFailure>,
    pub warnings: Vec<ClipWarning>,
    /// Range actually extracted
    pub range: Option<TimeRange>,
    pub frames_written: u64,
}

impl ClipResult {
    pub fn succeeded(output_path: PathBuf, range: TimeRange, frames_written: u64, warnings: Vec<ClipWarning>) -> Self {
        Self {
            success: true,
            output_path,
            error: None,
            warnings,
            range: Some(range),
            frames_written,
        }
    }

    pub fn failed(output_path: PathBuf, error: &ClipError) -> Self {
        Self {
            success: false,
            output_path,
            error: Some(ClipFailure {
                kind: error.kind(),
                message: error.to_string(),
            }),
            warnings: Vec::new(),
            range: None,
            frames_written: 0,
        }
    }

    pub fn error_kind(&self) -> Option<ClipErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}
