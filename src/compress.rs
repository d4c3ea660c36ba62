//! Size-check and retry control — the compression entry point.
//!
//! Encode, measure, tighten, re-encode: compression of arbitrary content is
//! unpredictable at a fixed bitrate, so a single pass cannot guarantee a size
//! ceiling. The loop is explicitly bounded at three attempts to keep
//! worst-case latency in check (each attempt re-encodes at roughly wall-clock
//! speed).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::codec::preferred_output_codec;
use crate::error::MediaError;
use crate::ffmpeg::ffprobe::probe_video;
use crate::ffmpeg::temp::persist_to;
use crate::plan::{MAX_ATTEMPTS, narrowed_max_dimension, plan_for_attempt, should_retry};

const MIB: f64 = 1024.0 * 1024.0;

/// Caller-facing knobs. Everything else is planned per attempt.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressionOptions {
    /// Byte-size budget in MB the output must fit within.
    #[serde(rename = "maxSizeMB")]
    pub max_size_mb: f64,
    /// Ceiling on the longest output dimension for the first attempt.
    pub max_width_or_height: u32,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_size_mb: 10.0,
            max_width_or_height: 1920,
        }
    }
}

impl CompressionOptions {
    pub fn max_size_bytes(&self) -> u64 {
        (self.max_size_mb * MIB) as u64
    }
}

/// An accepted compression result. The file lives at `path` (moved out of the
/// temp area by `persist`) and fits the requested budget.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedVideo {
    pub path: PathBuf,
    pub mime_type: &'static str,
    pub extension: &'static str,
    pub size_bytes: u64,
}

impl CompressedVideo {
    /// Move the output to a caller-chosen destination.
    pub fn persist(mut self, dest: &Path) -> Result<Self, MediaError> {
        persist_to(&self.path, dest)?;
        self.path = dest.to_path_buf();
        Ok(self)
    }
}

/// Compress `input` until it fits `options.max_size_mb`, or fail.
///
/// Probes the source, then runs up to three plan→encode→measure cycles,
/// narrowing the dimension ceiling between attempts. Resolves with a file
/// whose size honors the budget, or rejects with `SizeExceeded` carrying the
/// last achieved size. Encoder and probe failures are not retried; they are
/// a different failure class from an oversized output.
pub fn compress_video(
    input: &Path,
    options: &CompressionOptions,
    cancel: &CancelToken,
) -> Result<CompressedVideo, MediaError> {
    compress_video_with_progress(input, options, cancel, None)
}

/// `compress_video` with a normalized per-attempt progress callback.
pub fn compress_video_with_progress(
    input: &Path,
    options: &CompressionOptions,
    cancel: &CancelToken,
    progress_callback: Option<Arc<dyn Fn(f64) + Send + Sync>>,
) -> Result<CompressedVideo, MediaError> {
    let meta = probe_video(input)?;
    let codec = preferred_output_codec()?;
    let max_bytes = options.max_size_bytes();

    log::info!(
        target: "fitvid::compress",
        "Compressing {} ({:.1}MB, {}x{}, {:.1}s) to <= {}MB as {}",
        input.display(),
        meta.size as f64 / MIB,
        meta.width,
        meta.height,
        meta.duration,
        options.max_size_mb,
        codec.container
    );

    let mut max_dimension = options.max_width_or_height;
    let mut last_size = 0u64;

    for attempt in 1..=MAX_ATTEMPTS {
        if cancel.is_cancelled() {
            return Err(MediaError::Aborted);
        }

        let plan = plan_for_attempt(meta.size, attempt, max_dimension);
        log::info!(
            target: "fitvid::compress",
            "Attempt {}/{}: bitrate={}bps, max_dimension={}, fps={}",
            attempt,
            MAX_ATTEMPTS,
            plan.video_bitrate_bps,
            plan.max_dimension,
            plan.frame_rate
        );

        let output = crate::encode::encode_attempt(
            input,
            &meta,
            &plan,
            codec,
            cancel,
            progress_callback.clone(),
        )?;
        let size = fs::metadata(output.path())?.len();

        if size <= max_bytes {
            log::info!(
                target: "fitvid::compress",
                "Accepted attempt {}: {:.1}MB",
                attempt,
                size as f64 / MIB
            );
            return Ok(CompressedVideo {
                path: output.into_path(),
                mime_type: codec.mime_type,
                extension: codec.extension,
                size_bytes: size,
            });
        }

        // Oversized: the temp output is dropped (deleted) here.
        last_size = size;
        log::warn!(
            target: "fitvid::compress",
            "Attempt {} produced {:.1}MB, over the {}MB budget",
            attempt,
            size as f64 / MIB,
            options.max_size_mb
        );

        if !should_retry(attempt, &plan) {
            break;
        }
        max_dimension = narrowed_max_dimension(max_dimension);
    }

    Err(MediaError::size_exceeded(last_size, options.max_size_mb))
}
