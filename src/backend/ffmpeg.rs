use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::backend::{AudioJob, Backend, DecodeJob, EncodeJob, FrameReader, FrameWriter};
use crate::config::EncoderConfig;
use crate::error::ClipError;
use crate::video::{probe, Frame, MediaInfo};

/// Backend driving the external `ffmpeg` and `ffprobe` executables
///
/// Frames are streamed as raw `rgb24` through the child processes' stdout and
/// stdin, so nothing but the scratch audio and the output file touches disk.
pub struct FfmpegBackend {
    config: EncoderConfig,
}

impl FfmpegBackend {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Both executables can be launched
    pub fn is_available(&self) -> bool {
        [&self.config.ffmpeg, &self.config.ffprobe].iter().all(|program| {
            Command::new(program)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        })
    }

    /// Probe with the ffprobe executable regardless of enabled features
    pub fn probe_with_ffprobe(&self, path: &Path) -> Result<MediaInfo, ClipError> {
        let failed = |reason: String| ClipError::ProbeFailed {
            path: path.display().to_string(),
            reason,
        };

        let output = Command::new(&self.config.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| failed(format!("failed to run {}: {}", self.config.ffprobe.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!("ffprobe failed: {}", stderr.trim())));
        }

        let json = String::from_utf8_lossy(&output.stdout);
        probe::parse_ffprobe_json(&json, path)
    }

    fn ffmpeg(&self) -> Command {
        let mut cmd = Command::new(&self.config.ffmpeg);
        cmd.args(["-hide_banner", "-loglevel", "error"]);
        cmd
    }
}

impl Backend for FfmpegBackend {
    fn probe(&self, path: &Path) -> Result<MediaInfo, ClipError> {
        #[cfg(feature = "ffmpeg")]
        {
            probe::probe_native(path)
        }
        #[cfg(not(feature = "ffmpeg"))]
        {
            self.probe_with_ffprobe(path)
        }
    }

    fn decode(&self, job: &DecodeJob) -> Result<Box<dyn FrameReader>, ClipError> {
        let mut filters = Vec::new();
        if let Some(fps) = job.fps {
            filters.push(format!("fps={}", fps));
        }
        // Pins the pipe geometry even if autorotation disagrees with the probe
        filters.push(format!("scale={}:{}", job.width, job.height));

        let mut cmd = self.ffmpeg();
        cmd.arg("-nostdin")
            .arg("-ss")
            .arg(seconds_arg(job.range.start))
            .arg("-i")
            .arg(&job.source)
            .arg("-t")
            .arg(seconds_arg(job.range.duration()))
            .args(["-map", "0:v:0", "-an", "-sn", "-dn"])
            .arg("-vf")
            .arg(filters.join(","))
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped());

        debug!("Decoding {:?}", cmd);

        let mut process = ChildProcess::spawn(cmd).map_err(|e| ClipError::DecodeFailure {
            reason: format!("failed to spawn {}: {}", self.config.ffmpeg.display(), e),
        })?;
        let stdout = process.child.stdout.take().ok_or_else(|| ClipError::DecodeFailure {
            reason: "decoder stdout unavailable".to_string(),
        })?;

        Ok(Box::new(PipeFrameReader {
            process,
            stdout,
            width: job.width,
            height: job.height,
        }))
    }

    fn extract_audio(&self, job: &AudioJob, scratch: &Path) -> Result<(), ClipError> {
        let mut cmd = self.ffmpeg();
        cmd.args(["-nostdin", "-y"])
            .arg("-ss")
            .arg(seconds_arg(job.range.start))
            .arg("-i")
            .arg(&job.source)
            .arg("-t")
            .arg(seconds_arg(job.range.duration()))
            .args(["-map", "0:a:0", "-vn", "-sn", "-dn"]);
        if let Some(rate) = job.sample_rate {
            cmd.arg("-ar").arg(rate.to_string());
        }
        cmd.args(["-map_metadata", "-1", "-fflags", "+bitexact"])
            .args(["-c:a", "pcm_s16le", "-f", "wav"])
            .arg(scratch)
            .stdin(Stdio::null());

        debug!("Extracting audio {:?}", cmd);

        let output = cmd.output().map_err(|e| ClipError::EncodeFailure {
            reason: format!("failed to spawn {}: {}", self.config.ffmpeg.display(), e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClipError::EncodeFailure {
                reason: format!("audio extraction failed: {}", stderr.trim()),
            });
        }

        Ok(())
    }

    fn encode(&self, job: &EncodeJob) -> Result<Box<dyn FrameWriter>, ClipError> {
        let config = &self.config;
        let fps = job.fps.to_string();

        let mut cmd = self.ffmpeg();
        cmd.arg("-y")
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(format!("{}x{}", job.width, job.height))
            .arg("-framerate")
            .arg(&fps)
            .args(["-i", "pipe:0"]);
        if let Some(audio) = &job.audio {
            cmd.arg("-i").arg(audio);
        }

        cmd.args(["-map", "0:v:0"]);
        if job.audio.is_some() {
            cmd.args(["-map", "1:a:0"]);
        }

        cmd.arg("-c:v").arg(&config.video_codec);
        if !config.preset.is_empty() {
            cmd.arg("-preset").arg(&config.preset);
        }
        cmd.arg("-crf")
            .arg(config.crf().to_string())
            .arg("-pix_fmt")
            .arg(&config.pixel_format)
            .arg("-r")
            .arg(&fps);

        if job.audio.is_some() {
            cmd.arg("-c:a")
                .arg(&config.audio_codec)
                .arg("-b:a")
                .arg(&config.audio_bitrate);
        }

        cmd.arg("-threads").arg(config.threads.to_string());
        if config.bitexact {
            cmd.args([
                "-map_metadata", "-1",
                "-fflags", "+bitexact",
                "-flags:v", "+bitexact",
                "-flags:a", "+bitexact",
            ]);
        }
        cmd.args(["-movflags", "+faststart", "-f", "mp4"])
            .arg(&job.output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null());

        debug!("Encoding {:?}", cmd);

        let mut process = ChildProcess::spawn(cmd).map_err(|e| ClipError::EncodeFailure {
            reason: format!("failed to spawn {}: {}", config.ffmpeg.display(), e),
        })?;
        let stdin = process.child.stdin.take().ok_or_else(|| ClipError::EncodeFailure {
            reason: "encoder stdin unavailable".to_string(),
        })?;

        Ok(Box::new(PipeFrameWriter {
            process,
            stdin: Some(stdin),
            width: job.width,
            height: job.height,
        }))
    }
}

fn seconds_arg(seconds: f64) -> String {
    format!("{:.6}", seconds)
}

/// A child ffmpeg whose stderr is drained on a helper thread
///
/// Killed and reaped on drop unless it was waited for.
struct ChildProcess {
    child: Child,
    stderr: Option<JoinHandle<String>>,
    reaped: bool,
}

impl ChildProcess {
    fn spawn(mut cmd: Command) -> std::io::Result<Self> {
        cmd.stderr(Stdio::piped());
        let mut child = cmd.spawn()?;

        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        Ok(Self { child, stderr, reaped: false })
    }

    /// Wait for exit; the error carries ffmpeg's own diagnostics
    fn wait(mut self) -> Result<(), String> {
        let status = self.child.wait().map_err(|e| e.to_string())?;
        self.reaped = true;

        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(format!("ffmpeg exited with {}: {}", status, stderr.trim()))
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        if let Err(e) = self.child.kill() {
            if e.kind() != ErrorKind::InvalidInput {
                warn!("Failed to kill ffmpeg process {}: {}", self.child.id(), e);
            }
        }
        let _ = self.child.wait();
    }
}

struct PipeFrameReader {
    process: ChildProcess,
    stdout: ChildStdout,
    width: u32,
    height: u32,
}

impl FrameReader for PipeFrameReader {
    fn next_frame(&mut self) -> Result<Option<Frame>, ClipError> {
        let frame_len = Frame::byte_len(self.width, self.height);
        let mut buffer = vec![0u8; frame_len];
        let mut filled = 0;

        while filled < frame_len {
            match self.stdout.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ClipError::DecodeFailure {
                        reason: format!("reading decoder output: {}", e),
                    })
                }
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < frame_len {
            return Err(ClipError::DecodeFailure {
                reason: format!("truncated frame: got {} of {} bytes", filled, frame_len),
            });
        }

        Frame::from_rgb_bytes(self.width, self.height, buffer)
            .map(Some)
            .ok_or_else(|| ClipError::DecodeFailure {
                reason: "frame buffer size mismatch".to_string(),
            })
    }

    fn finish(self: Box<Self>) -> Result<(), ClipError> {
        let PipeFrameReader { process, stdout, .. } = *self;
        drop(stdout);
        process.wait().map_err(|reason| ClipError::DecodeFailure { reason })
    }
}

struct PipeFrameWriter {
    process: ChildProcess,
    stdin: Option<ChildStdin>,
    width: u32,
    height: u32,
}

impl FrameWriter for PipeFrameWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), ClipError> {
        if (frame.width(), frame.height()) != (self.width, self.height) {
            return Err(ClipError::EncodeFailure {
                reason: format!(
                    "frame is {}x{}, encoder expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.width,
                    self.height
                ),
            });
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| ClipError::EncodeFailure {
            reason: "encoder input already closed".to_string(),
        })?;

        stdin.write_all(frame.as_rgb_bytes()).map_err(|e| ClipError::EncodeFailure {
            reason: match e.kind() {
                ErrorKind::BrokenPipe => "encoder exited early".to_string(),
                _ => format!("writing encoder input: {}", e),
            },
        })
    }

    fn finish(self: Box<Self>) -> Result<(), ClipError> {
        let PipeFrameWriter { process, stdin, .. } = *self;
        // Closing stdin is what tells ffmpeg the stream is over
        drop(stdin);
        process.wait().map_err(|reason| ClipError::EncodeFailure { reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::TimeRange;
    use std::path::PathBuf;

    fn missing_binaries() -> FfmpegBackend {
        FfmpegBackend::new(EncoderConfig {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg"),
            ffprobe: PathBuf::from("/nonexistent/ffprobe"),
            ..EncoderConfig::default()
        })
    }

    #[test]
    fn test_seconds_arg_format() {
        assert_eq!(seconds_arg(2.0), "2.000000");
        assert_eq!(seconds_arg(3723.5), "3723.500000");
    }

    #[test]
    fn test_missing_executables() {
        let backend = missing_binaries();
        assert!(!backend.is_available());

        let err = backend.probe_with_ffprobe(Path::new("video.mp4")).unwrap_err();
        assert!(matches!(err, ClipError::ProbeFailed { .. }));

        let job = DecodeJob {
            source: PathBuf::from("video.mp4"),
            range: TimeRange { start: 0.0, end: 1.0 },
            fps: Some(24.0),
            width: 16,
            height: 16,
        };
        assert!(matches!(backend.decode(&job), Err(ClipError::DecodeFailure { .. })));

        let job = EncodeJob {
            output: PathBuf::from("out.mp4"),
            width: 16,
            height: 16,
            fps: 24.0,
            audio: None,
        };
        assert!(matches!(backend.encode(&job), Err(ClipError::EncodeFailure { .. })));
    }
}
