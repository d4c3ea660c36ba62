//! FFprobe-based metadata probing — the first stage of every pipeline run.
//!
//! Callers use the result to enforce their duration policy and to decide
//! whether compression is needed at all; the re-encoder uses it for
//! dimension fitting and the audio remux decision.

use crate::error::MediaError;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

use super::discovery::get_ffprobe_path;

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    streams: Option<Vec<FfprobeStream>>,
}

/// Source video metadata: duration in seconds, pixel dimensions, byte size.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    pub has_audio: bool,
}

/// Parse ffprobe JSON output into VideoMetadata. Lenient: missing fields
/// default to zero; `probe_video` applies the stricter contract.
pub fn parse_ffprobe_json(json: &str) -> Result<VideoMetadata, MediaError> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| MediaError::MediaLoad(format!("failed to parse ffprobe JSON: {}", e)))?;

    let format = output.format.as_ref();
    let duration = format
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let size = format
        .and_then(|f| f.size.as_ref())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let video_stream = output.streams.as_ref().and_then(|streams| {
        streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
    });
    let width = video_stream.and_then(|s| s.width).unwrap_or(0);
    let height = video_stream.and_then(|s| s.height).unwrap_or(0);
    let has_audio = output
        .streams
        .as_ref()
        .is_some_and(|streams| streams.iter().any(|s| s.codec_type.as_deref() == Some("audio")));

    Ok(VideoMetadata {
        duration,
        width,
        height,
        size,
        has_audio,
    })
}

/// Probe a video file. Fails with `MediaLoad` when the input cannot be
/// decoded at all (corrupt, unsupported container, zero-byte file) or has
/// no video stream.
pub fn probe_video(path: &Path) -> Result<VideoMetadata, MediaError> {
    let ffprobe = get_ffprobe_path()?;
    let path_str = path.to_string_lossy();

    log::debug!(
        target: "fitvid::ffmpeg::ffprobe",
        "probe_video: path={}",
        path_str
    );

    let output = Command::new(&ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            &path_str,
        ])
        .output()
        .map_err(|e| MediaError::MediaLoad(format!("failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::MediaLoad(format!(
            "ffprobe failed: {}",
            stderr.trim()
        )));
    }

    let json = String::from_utf8(output.stdout)
        .map_err(|_| MediaError::MediaLoad("ffprobe output was not valid UTF-8".to_string()))?;

    let mut meta = parse_ffprobe_json(&json)?;
    if meta.width == 0 || meta.height == 0 {
        return Err(MediaError::MediaLoad("no video stream".to_string()));
    }
    if meta.size == 0 {
        // Some containers omit format.size; fall back to the filesystem.
        meta.size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ffprobe_json_extracts_metadata() {
        let json = r#"{
            "format": {
                "duration": "30.5",
                "size": "12345678"
            },
            "streams": [
                {
                    "codec_type": "video",
                    "width": 1920,
                    "height": 1080
                },
                {
                    "codec_type": "audio"
                }
            ]
        }"#;
        let meta = parse_ffprobe_json(json).unwrap();
        assert_eq!(meta.duration, 30.5);
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.height, 1080);
        assert_eq!(meta.size, 12_345_678);
        assert!(meta.has_audio);
    }

    #[test]
    fn parse_ffprobe_json_handles_missing_audio() {
        let json = r#"{
            "format": { "duration": "10.0", "size": "1000" },
            "streams": [{"codec_type": "video", "width": 640, "height": 480}]
        }"#;
        let meta = parse_ffprobe_json(json).unwrap();
        assert!(!meta.has_audio);
    }

    #[test]
    fn parse_ffprobe_json_handles_missing_video_stream() {
        let json = r#"{
            "format": { "duration": "10.0", "size": "1000" },
            "streams": [{"codec_type": "audio"}]
        }"#;
        let meta = parse_ffprobe_json(json).unwrap();
        assert_eq!(meta.width, 0);
        assert_eq!(meta.height, 0);
    }

    #[test]
    fn parse_ffprobe_json_handles_empty_output() {
        let json = r#"{"format": {}, "streams": []}"#;
        let meta = parse_ffprobe_json(json).unwrap();
        assert_eq!(meta.duration, 0.0);
        assert_eq!(meta.size, 0);
        assert!(!meta.has_audio);
    }

    #[test]
    fn parse_ffprobe_json_rejects_garbage() {
        let err = parse_ffprobe_json("not json").unwrap_err();
        assert!(matches!(err, MediaError::MediaLoad(_)));
    }
}
