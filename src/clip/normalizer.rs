use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use tracing::{debug, info, warn};

use crate::backend::{AudioJob, Backend, DecodeJob, EncodeJob};
use crate::clip::types::{ClipRequest, ClipResult, ClipWarning, TimeRange};
use crate::error::ClipError;
use crate::video::{resize_and_pad, AudioStreamInfo};

/// Cuts, resamples, letterboxes and re-encodes clips through a [`Backend`]
///
/// Each request runs start to finish on the calling thread. Failures never
/// escape [`clip`](Self::clip): they come back as a failed [`ClipResult`] so
/// one bad row cannot stop a batch.
pub struct ClipNormalizer<B: Backend> {
    backend: B,
}

struct Completed {
    range: TimeRange,
    frames_written: u64,
    warnings: Vec<ClipWarning>,
}

/// Header facts read back from the scratch WAV
#[derive(Debug, Clone, Copy)]
struct ScratchAudio {
    sample_rate: u32,
    channels: u16,
    seconds: f64,
}

impl<B: Backend> ClipNormalizer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Produce `request.output_path` from the requested range of the source
    ///
    /// Steps, each of which may end the request early:
    /// 1. the source must exist (nothing is written otherwise)
    /// 2. the output directory is created
    /// 3. start/end are parsed and checked against the source duration
    /// 4. audio of the range is extracted, resampled, to a scratch WAV
    /// 5. frames of the range are decoded at the target rate, letterboxed,
    ///    and encoded together with the scratch audio
    ///
    /// The encoder writes to a hidden partial file next to the output that is
    /// renamed into place only once encoding succeeded. Scratch and partial
    /// files are removed on every exit path.
    pub fn clip(&self, request: &ClipRequest) -> ClipResult {
        debug!(
            "Clipping {} [{} - {}] -> {}",
            request.source_path.display(),
            request.start,
            request.end,
            request.output_path.display()
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(request)))
            .unwrap_or_else(|payload| Err(ClipError::BackendFault { reason: panic_message(payload.as_ref()) }));

        match outcome {
            Ok(done) => {
                info!(
                    "Saved {} ({:.2}s - {:.2}s, {} frames)",
                    request.output_path.display(),
                    done.range.start,
                    done.range.end,
                    done.frames_written
                );
                ClipResult::succeeded(request.output_path.clone(), done.range, done.frames_written, done.warnings)
            }
            Err(err) => {
                debug!("Failed to clip {}: {}", request.source_path.display(), err);
                ClipResult::failed(request.output_path.clone(), &err)
            }
        }
    }

    fn run(&self, request: &ClipRequest) -> Result<Completed, ClipError> {
        let source = &request.source_path;
        if !source.exists() {
            return Err(ClipError::SourceNotFound { path: source.display().to_string() });
        }

        let output_dir = output_dir(&request.output_path);
        fs::create_dir_all(&output_dir).map_err(|e| ClipError::io(&output_dir, e))?;

        let start = request.start.seconds()?;
        let end = request.end.seconds()?;
        debug!("Requested range: {}s - {}s", start, end);

        let info = self.backend.probe(source)?;
        let (range, clamped) = TimeRange::resolve(start, end, info.duration)?;

        let mut warnings = Vec::new();
        if let Some(warning) = clamped {
            match &warning {
                ClipWarning::EndClamped { requested, duration } => {
                    warn!("End time {}s is past the source; clamped to {}s", requested, duration);
                }
            }
            warnings.push(warning);
        }

        let targets = request.targets;
        let fps = targets.fps.unwrap_or(info.video.fps);
        // Without a canvas size the source geometry is kept, cut down to even
        // dimensions so 4:2:0 encoders accept it
        let (width, height) = match targets.size {
            Some(size) => (size, size),
            None => (even(info.video.width), even(info.video.height)),
        };
        let (decode_width, decode_height) = match targets.size {
            Some(_) => (info.video.width, info.video.height),
            None => (width, height),
        };

        let scratch_audio = match &info.audio {
            Some(audio) => Some(self.prepare_audio(request, range, audio)?),
            None => {
                debug!("{} has no audio track", source.display());
                None
            }
        };

        let partial = Builder::new()
            .prefix(".clip-")
            .suffix(".partial.mp4")
            .tempfile_in(&output_dir)
            .map_err(|e| ClipError::io(&output_dir, e))?;

        let mut reader = self.backend.decode(&DecodeJob {
            source: source.clone(),
            range,
            fps: targets.fps,
            width: decode_width,
            height: decode_height,
        })?;
        let mut writer = self.backend.encode(&EncodeJob {
            output: partial.path().to_path_buf(),
            width,
            height,
            fps,
            audio: scratch_audio.as_ref().map(|scratch| scratch.path().to_path_buf()),
        })?;

        let mut frames_written = 0u64;
        while let Some(frame) = reader.next_frame()? {
            let frame = match targets.size {
                Some(size) => resize_and_pad(&frame, size),
                None => frame,
            };
            writer.write_frame(&frame)?;
            frames_written += 1;
        }
        reader.finish()?;

        if frames_written == 0 {
            return Err(ClipError::DecodeFailure {
                reason: format!("no frames decoded between {}s and {}s", range.start, range.end),
            });
        }
        writer.finish()?;

        partial
            .persist(&request.output_path)
            .map_err(|e| ClipError::io(&request.output_path, e.error))?;

        Ok(Completed { range, frames_written, warnings })
    }

    /// Extract the range's audio into a scratch WAV that is deleted on drop
    fn prepare_audio(
        &self,
        request: &ClipRequest,
        range: TimeRange,
        audio: &AudioStreamInfo,
    ) -> Result<NamedTempFile, ClipError> {
        let scratch = Builder::new()
            .prefix("clip-audio-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| ClipError::io(std::env::temp_dir(), e))?;

        let job = AudioJob {
            source: request.source_path.clone(),
            range,
            sample_rate: request.targets.sample_rate,
        };
        self.backend.extract_audio(&job, scratch.path())?;

        let wav = inspect_wav(scratch.path())?;
        if let Some(expected) = request.targets.sample_rate {
            if wav.sample_rate != expected {
                return Err(ClipError::DecodeFailure {
                    reason: format!("scratch audio is {} Hz, expected {} Hz", wav.sample_rate, expected),
                });
            }
        }

        debug!(
            "Scratch audio: {} Hz, {} channel(s), {:.2}s (source {} Hz {})",
            wav.sample_rate, wav.channels, wav.seconds, audio.sample_rate, audio.codec
        );
        Ok(scratch)
    }
}

fn inspect_wav(path: &Path) -> Result<ScratchAudio, ClipError> {
    let reader = hound::WavReader::open(path).map_err(|e| ClipError::DecodeFailure {
        reason: format!("unreadable scratch audio: {}", e),
    })?;
    let spec = reader.spec();
    let seconds = match spec.sample_rate {
        0 => 0.0,
        rate => f64::from(reader.duration()) / f64::from(rate),
    };

    Ok(ScratchAudio {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        seconds,
    })
}

fn even(dimension: u32) -> u32 {
    (dimension & !1).max(2)
}

fn output_dir(output_path: &Path) -> PathBuf {
    match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "backend panicked".to_string()
    }
}
