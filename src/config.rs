use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    clip::ClipTargets,
    error::{ConfigError, Result},
};

/// Main configuration for the clip normalizer
///
/// Everything the backend needs is passed in explicitly through this struct;
/// no process-wide environment toggles are read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output frame rate, canvas size and sample rate
    #[serde(default)]
    pub clip: ClipConfig,

    /// External encoder settings
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Clip table layout
    #[serde(default)]
    pub table: TableConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.clip.validate()?;
        self.encoder.validate()?;
        self.table.validate()?;

        if let Some(size) = self.clip.size {
            if size % 2 != 0 && self.encoder.requires_even_dimensions() {
                return Err(invalid("clip.size", size).into());
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Normalization targets; a missing key skips that step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipConfig {
    pub fps: Option<f64>,
    pub size: Option<u32>,
    pub sample_rate: Option<u32>,
}

impl Default for ClipConfig {
    fn default() -> Self {
        let targets = ClipTargets::default();
        Self {
            fps: targets.fps,
            size: targets.size,
            sample_rate: targets.sample_rate,
        }
    }
}

impl ClipConfig {
    pub fn targets(&self) -> ClipTargets {
        ClipTargets {
            fps: self.fps,
            size: self.size,
            sample_rate: self.sample_rate,
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(fps) = self.fps {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(invalid("clip.fps", fps).into());
            }
        }

        if self.size == Some(0) {
            return Err(invalid("clip.size", 0).into());
        }

        if self.sample_rate == Some(0) {
            return Err(invalid("clip.sample_rate", 0).into());
        }

        Ok(())
    }
}

/// Settings for the external `ffmpeg`/`ffprobe` executables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,

    pub video_codec: String,
    pub audio_codec: String,
    pub audio_bitrate: String,

    /// x264 preset
    pub preset: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,

    pub pixel_format: String,

    /// Encoder threads
    pub threads: usize,

    /// Strip muxer/encoder version stamps so identical input gives identical output
    pub bitexact: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            preset: "medium".to_string(),
            quality: 65,
            pixel_format: "yuv420p".to_string(),
            threads: num_cpus::get(),
            bitexact: true,
        }
    }
}

impl EncoderConfig {
    /// Map the 0-100 quality scale onto an x264 CRF (51 worst, 0 lossless)
    pub fn crf(&self) -> u8 {
        (51 - ((self.quality as f32 / 100.0) * 51.0) as u8).clamp(0, 51)
    }

    /// Chroma-subsampled 4:2:0 formats need even frame dimensions
    pub fn requires_even_dimensions(&self) -> bool {
        let format = self.pixel_format.as_str();
        format.starts_with("yuv420") || format.starts_with("yuvj420") || format == "nv12" || format == "nv21"
    }

    fn validate(&self) -> Result<()> {
        if self.ffmpeg.as_os_str().is_empty() {
            return Err(invalid("encoder.ffmpeg", "").into());
        }

        if self.ffprobe.as_os_str().is_empty() {
            return Err(invalid("encoder.ffprobe", "").into());
        }

        if self.video_codec.trim().is_empty() {
            return Err(invalid("encoder.video_codec", &self.video_codec).into());
        }

        if self.audio_codec.trim().is_empty() {
            return Err(invalid("encoder.audio_codec", &self.audio_codec).into());
        }

        if self.quality > 100 {
            return Err(invalid("encoder.quality", self.quality).into());
        }

        if self.threads == 0 {
            return Err(invalid("encoder.threads", self.threads).into());
        }

        Ok(())
    }
}

/// Column names and layout of the clip table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub url_column: String,
    pub start_column: String,
    pub end_column: String,
    pub delimiter: char,
    /// Extension of the downloaded source videos
    pub input_extension: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            url_column: "URL".to_string(),
            start_column: "start_timecode".to_string(),
            end_column: "end_timecode".to_string(),
            delimiter: ',',
            input_extension: "mp4".to_string(),
        }
    }
}

impl TableConfig {
    fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("table.url_column", &self.url_column),
            ("table.start_column", &self.start_column),
            ("table.end_column", &self.end_column),
            ("table.input_extension", &self.input_extension),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(key, value).into());
            }
        }

        if !self.delimiter.is_ascii() || self.delimiter == '"' || self.delimiter == '\n' {
            return Err(invalid("table.delimiter", self.delimiter.escape_default()).into());
        }

        Ok(())
    }
}
