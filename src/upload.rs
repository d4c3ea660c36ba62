//! Upload preparation policy.
//!
//! The pipeline itself never decides whether to compress; these are the
//! caller-side rules: reject overlong sources, skip the re-encoder entirely
//! when the file already fits the budget, and treat thumbnail failures as
//! "continue without a thumbnail" — getting the video uploaded matters more
//! than having a preview image.

use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::compress::{CompressedVideo, CompressionOptions, compress_video};
use crate::error::MediaError;
use crate::ffmpeg::ffprobe::probe_video;
use crate::thumbnail::{DEFAULT_THUMBNAIL_TIME_SECS, generate_thumbnail};

/// Recordings longer than this are rejected before any compression starts.
pub const MAX_UPLOAD_DURATION_SECS: f64 = 30.0;

#[derive(Debug, Clone, Copy)]
pub struct UploadOptions {
    pub compression: CompressionOptions,
    pub max_duration_secs: f64,
    pub thumbnail_time_secs: f64,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            compression: CompressionOptions::default(),
            max_duration_secs: MAX_UPLOAD_DURATION_SECS,
            thumbnail_time_secs: DEFAULT_THUMBNAIL_TIME_SECS,
        }
    }
}

/// The video to upload: either the untouched source (already within budget)
/// or a compression result.
#[derive(Debug)]
pub enum PreparedVideo {
    Original { path: PathBuf, size_bytes: u64 },
    Compressed(CompressedVideo),
}

impl PreparedVideo {
    pub fn path(&self) -> &Path {
        match self {
            Self::Original { path, .. } => path,
            Self::Compressed(c) => &c.path,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        match self {
            Self::Original { size_bytes, .. } => *size_bytes,
            Self::Compressed(c) => c.size_bytes,
        }
    }
}

#[derive(Debug)]
pub struct PreparedUpload {
    pub video: PreparedVideo,
    /// `data:image/jpeg;base64,…`, or None when thumbnailing failed.
    pub thumbnail: Option<String>,
}

/// True when the source byte size exceeds the budget and compression is needed.
pub fn needs_compression(size_bytes: u64, max_size_mb: f64) -> bool {
    size_bytes as f64 / (1024.0 * 1024.0) > max_size_mb
}

/// Probe, enforce the duration ceiling, compress only when over budget, and
/// attach a thumbnail when one can be produced.
pub fn prepare_for_upload(
    input: &Path,
    options: &UploadOptions,
    cancel: &CancelToken,
) -> Result<PreparedUpload, MediaError> {
    let meta = probe_video(input)?;

    if meta.duration > options.max_duration_secs {
        return Err(MediaError::TooLong {
            duration_secs: meta.duration,
            limit_secs: options.max_duration_secs,
        });
    }

    let video = if needs_compression(meta.size, options.compression.max_size_mb) {
        PreparedVideo::Compressed(compress_video(input, &options.compression, cancel)?)
    } else {
        log::debug!(
            target: "fitvid::upload",
            "{} is already within budget; skipping compression",
            input.display()
        );
        PreparedVideo::Original {
            path: input.to_path_buf(),
            size_bytes: meta.size,
        }
    };

    let thumbnail = match generate_thumbnail(video.path(), options.thumbnail_time_secs) {
        Ok(data_url) => Some(data_url),
        Err(e) => {
            log::warn!(
                target: "fitvid::upload",
                "Thumbnail generation failed, continuing without one: {}",
                e
            );
            None
        }
    };

    Ok(PreparedUpload { video, thumbnail })
}
