//! Media probing.
//!
//! The default path decodes the JSON printed by
//! `ffprobe -print_format json -show_format -show_streams`. With the `ffmpeg`
//! feature the same information is read through libavformat directly.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ClipError;
use crate::video::types::{AudioStreamInfo, MediaInfo, VideoStreamInfo};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<serde_json::Value>,
}

impl FfprobeStream {
    fn is(&self, kind: &str) -> bool {
        self.codec_type.as_deref() == Some(kind)
    }

    /// Rotation in degrees from either the legacy tag or display matrix side data
    fn rotation(&self) -> i64 {
        if let Some(rotate) = self.tags.get("rotate").and_then(|r| r.trim().parse::<i64>().ok()) {
            return rotate;
        }
        self.side_data_list
            .iter()
            .find_map(|side_data| side_data.get("rotation").and_then(serde_json::Value::as_i64))
            .unwrap_or(0)
    }
}

/// Build [`MediaInfo`] from ffprobe's JSON output for `path`
pub fn parse_ffprobe_json(json: &str, path: &Path) -> Result<MediaInfo, ClipError> {
    let failed = |reason: String| ClipError::ProbeFailed {
        path: path.display().to_string(),
        reason,
    };

    let output: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| failed(format!("unreadable ffprobe output: {}", e)))?;

    let video = output
        .streams
        .iter()
        .find(|s| s.is("video"))
        .ok_or_else(|| failed("no video stream".to_string()))?;

    let (mut width, mut height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(failed("video stream has no dimensions".to_string())),
    };
    if video.rotation().rem_euclid(180) == 90 {
        std::mem::swap(&mut width, &mut height);
    }

    let fps = video
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .ok_or_else(|| failed("video stream has no frame rate".to_string()))?;

    let duration = output
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_seconds)
        .or_else(|| video.duration.as_deref().and_then(parse_seconds))
        .ok_or_else(|| failed("unknown duration".to_string()))?;

    let audio = output
        .streams
        .iter()
        .find(|s| s.is("audio"))
        .and_then(|s| {
            let sample_rate = s.sample_rate.as_deref()?.trim().parse::<u32>().ok()?;
            Some(AudioStreamInfo {
                sample_rate,
                channels: s.channels.unwrap_or(0),
                codec: s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            })
        });

    Ok(MediaInfo {
        duration,
        video: VideoStreamInfo {
            width,
            height,
            fps,
            codec: video.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
        },
        audio,
    })
}

/// Parse `"30000/1001"` or `"25"` into frames per second
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

fn parse_seconds(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
}

/// Probe through libavformat instead of the ffprobe executable
#[cfg(feature = "ffmpeg")]
pub fn probe_native(path: &Path) -> Result<MediaInfo, ClipError> {
    use ffmpeg_next::{codec, format, media, rescale};

    let failed = |reason: String| ClipError::ProbeFailed {
        path: path.display().to_string(),
        reason,
    };

    ffmpeg_next::init().map_err(|e| failed(format!("ffmpeg init failed: {}", e)))?;
    let input = format::input(&path).map_err(|e| failed(e.to_string()))?;

    let video_stream = input
        .streams()
        .best(media::Type::Video)
        .ok_or_else(|| failed("no video stream".to_string()))?;
    let video_codec = codec::context::Context::from_parameters(video_stream.parameters())
        .map_err(|e| failed(e.to_string()))?;
    let codec_name = video_codec.id().name().to_string();
    let decoder = video_codec.decoder().video().map_err(|e| failed(e.to_string()))?;

    let fps = f64::from(video_stream.avg_frame_rate());
    if !(fps.is_finite() && fps > 0.0) {
        return Err(failed("video stream has no frame rate".to_string()));
    }

    let (mut width, mut height) = (decoder.width(), decoder.height());
    let rotation = video_stream
        .metadata()
        .get("rotate")
        .and_then(|r| r.trim().parse::<i64>().ok())
        .unwrap_or(0);
    if rotation.rem_euclid(180) == 90 {
        std::mem::swap(&mut width, &mut height);
    }

    let duration = input.duration() as f64 * f64::from(rescale::TIME_BASE);
    if !(duration.is_finite() && duration >= 0.0) {
        return Err(failed("unknown duration".to_string()));
    }

    let audio = match input.streams().best(media::Type::Audio) {
        Some(stream) => {
            let context = codec::context::Context::from_parameters(stream.parameters())
                .map_err(|e| failed(e.to_string()))?;
            let codec_name = context.id().name().to_string();
            let decoder = context.decoder().audio().map_err(|e| failed(e.to_string()))?;
            Some(AudioStreamInfo {
                sample_rate: decoder.rate(),
                channels: u32::from(decoder.channels()),
                codec: codec_name,
            })
        }
        None => None,
    };

    Ok(MediaInfo {
        duration,
        video: VideoStreamInfo { width, height, fps, codec: codec_name },
        audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HD_WITH_AUDIO: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "codec_type": "video",
                "width": 1280,
                "height": 720,
                "r_frame_rate": "30/1",
                "avg_frame_rate": "30/1",
                "duration": "10.000000"
            },
            {
                "index": 1,
                "codec_name": "aac",
                "codec_type": "audio",
                "sample_rate": "44100",
                "channels": 2
            }
        ],
        "format": { "duration": "10.023000" }
    }"#;

    #[test]
    fn test_parse_video_and_audio() {
        let info = parse_ffprobe_json(HD_WITH_AUDIO, Path::new("a.mp4")).unwrap();
        assert_eq!(info.duration, 10.023);
        assert_eq!((info.video.width, info.video.height), (1280, 720));
        assert_eq!(info.video.fps, 30.0);
        assert_eq!(info.video.codec, "h264");

        let audio = info.audio.unwrap();
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.channels, 2);
    }

    #[test]
    fn test_silent_video_and_stream_duration_fallback() {
        let json = r#"{
            "streams": [
                { "codec_type": "video", "width": 640, "height": 480,
                  "avg_frame_rate": "0/0", "r_frame_rate": "25/1", "duration": "4.5" }
            ],
            "format": {}
        }"#;
        let info = parse_ffprobe_json(json, Path::new("b.mp4")).unwrap();
        assert!(info.audio.is_none());
        assert_eq!(info.duration, 4.5);
        assert_eq!(info.video.fps, 25.0);
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let json = r#"{
            "streams": [
                { "codec_type": "video", "width": 1920, "height": 1080, "avg_frame_rate": "30/1",
                  "side_data_list": [ { "side_data_type": "Display Matrix", "rotation": -90 } ] }
            ],
            "format": { "duration": "3.0" }
        }"#;
        let info = parse_ffprobe_json(json, Path::new("phone.mp4")).unwrap();
        assert_eq!((info.video.width, info.video.height), (1080, 1920));

        let json = r#"{
            "streams": [
                { "codec_type": "video", "width": 1920, "height": 1080, "avg_frame_rate": "30/1",
                  "tags": { "rotate": "180" } }
            ],
            "format": { "duration": "3.0" }
        }"#;
        let info = parse_ffprobe_json(json, Path::new("flipped.mp4")).unwrap();
        assert_eq!((info.video.width, info.video.height), (1920, 1080));
    }

    #[test]
    fn test_audio_only_file_is_rejected() {
        let json = r#"{ "streams": [ { "codec_type": "audio", "sample_rate": "16000" } ],
                        "format": { "duration": "1.0" } }"#;
        let err = parse_ffprobe_json(json, Path::new("a.m4a")).unwrap_err();
        assert!(err.to_string().contains("no video stream"));
    }

    #[test]
    fn test_frame_rate_forms() {
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }
}
