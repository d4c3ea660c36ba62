//! Thumbnail extraction: seek, rasterize one frame, serialize to JPEG.
//!
//! Failures here must never block an upload; callers log and continue
//! without a preview image. The 5 second timeout exists because seek/draw
//! can hang indefinitely on malformed media.

use std::fs;
use std::path::Path;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::encode::fit_dimensions;
use crate::error::MediaError;
use crate::ffmpeg::ffprobe::probe_video;
use crate::ffmpeg::temp::TempFile;
use crate::ffmpeg::{RunOptions, path_to_string, run_ffmpeg};

/// Default capture position.
pub const DEFAULT_THUMBNAIL_TIME_SECS: f64 = 2.0;
/// Longest raster dimension; aspect ratio is preserved.
const MAX_THUMBNAIL_DIMENSION: u32 = 1280;
/// JPEG quality on a 0..1 scale.
const THUMBNAIL_JPEG_QUALITY: f64 = 0.7;
/// Hard bound on the whole seek+draw+encode operation.
const THUMBNAIL_TIMEOUT: Duration = Duration::from_secs(5);
/// A JPEG smaller than this cannot be a real frame.
const MIN_VALID_JPEG_BYTES: usize = 100;

/// Map a 0..1 JPEG quality to FFmpeg's mjpeg `-q:v` scale (2 best, 31 worst).
fn jpeg_qscale(quality: f64) -> u32 {
    let q = quality.clamp(0.0, 1.0);
    (2.0 + (1.0 - q) * 29.0).round() as u32
}

/// Clamp the requested capture time so seeking never lands past the end.
fn clamp_seek_time(requested: f64, duration: f64) -> f64 {
    requested.min(duration - 0.1).max(0.0)
}

/// Read the extracted frame back. Every failure in the thumbnail path is a
/// `Thumbnail` error, including the output file going missing.
fn read_thumbnail_bytes(path: &Path) -> Result<Vec<u8>, MediaError> {
    let bytes = fs::read(path)
        .map_err(|e| MediaError::Thumbnail(format!("Thumbnail extraction failed: {}", e)))?;
    if bytes.len() < MIN_VALID_JPEG_BYTES {
        return Err(MediaError::Thumbnail(
            "Generated thumbnail is invalid".to_string(),
        ));
    }
    Ok(bytes)
}

/// Extract a frame at `time_secs` (clamped to the video's duration) and
/// return it as a `data:image/jpeg;base64,…` URL.
///
/// All failures come back as `MediaError::Thumbnail` with the specific
/// reason; temp resources are released on every path.
pub fn generate_thumbnail(input: &Path, time_secs: f64) -> Result<String, MediaError> {
    let meta = probe_video(input)
        .map_err(|e| MediaError::Thumbnail(format!("Video loading failed: {}", e)))?;

    if meta.width == 0 || meta.height == 0 {
        return Err(MediaError::Thumbnail("Invalid video dimensions".to_string()));
    }

    let seek = clamp_seek_time(time_secs, meta.duration);
    let (out_w, out_h) = fit_dimensions(meta.width, meta.height, MAX_THUMBNAIL_DIMENSION);

    log::debug!(
        target: "fitvid::thumbnail",
        "Extracting thumbnail: {} at {:.2}s -> {}x{}",
        input.display(),
        seek,
        out_w,
        out_h
    );

    let output = TempFile::with_extension("jpg")?;
    let args = vec![
        "-nostdin".to_string(),
        "-ss".to_string(),
        format!("{:.3}", seek),
        "-i".to_string(),
        path_to_string(input),
        "-frames:v".to_string(),
        "1".to_string(),
        "-vf".to_string(),
        format!("scale={}:{}", out_w, out_h),
        "-q:v".to_string(),
        jpeg_qscale(THUMBNAIL_JPEG_QUALITY).to_string(),
        path_to_string(output.path()),
    ];

    run_ffmpeg(
        args,
        RunOptions {
            timeout: Some(THUMBNAIL_TIMEOUT),
            ..Default::default()
        },
    )
    .map_err(|e| match e {
        MediaError::Timeout => MediaError::Thumbnail("Thumbnail generation timeout".to_string()),
        other => MediaError::Thumbnail(format!("Thumbnail extraction failed: {}", other)),
    })?;

    let bytes = read_thumbnail_bytes(output.path())?;

    Ok(format!(
        "data:image/jpeg;base64,{}",
        BASE64.encode(&bytes)
    ))
}
