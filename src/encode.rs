//! Single-attempt re-encoding.
//!
//! Builds the FFmpeg invocation for one compression attempt and runs it into
//! a temp file. Output dimensions preserve the source aspect ratio, clamped
//! to the plan's max dimension and rounded down to even (most codecs reject
//! odd dimensions). Audio is re-encoded at a fixed reduced bitrate; sources
//! without an audio track are encoded video-only.

use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::codec::OutputCodec;
use crate::error::MediaError;
use crate::ffmpeg::ffprobe::VideoMetadata;
use crate::ffmpeg::temp::TempFile;
use crate::ffmpeg::{RunOptions, path_to_string, run_ffmpeg};
use crate::plan::{AUDIO_BITRATE_BPS, CompressionPlan};

/// Encodes run at roughly wall-clock speed; beyond this multiple of the
/// source duration (plus startup slack) the attempt is considered hung.
const ENCODE_DEADLINE_FACTOR: f64 = 4.0;
const ENCODE_DEADLINE_SLACK_SECS: f64 = 30.0;

/// Scale (width, height) to fit within `max_dimension`, preserving aspect
/// ratio. Both results are rounded down to the nearest even integer.
pub fn fit_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let even = |n: u32| (n & !1).max(2);
    let longest = width.max(height);
    if longest <= max_dimension {
        return (even(width), even(height));
    }
    let scale = max_dimension as f64 / longest as f64;
    let w = (width as f64 * scale) as u32;
    let h = (height as f64 * scale) as u32;
    (even(w), even(h))
}

/// FFmpeg arguments for one compression attempt.
pub fn build_compress_args(
    input_path: &str,
    output_path: &str,
    plan: &CompressionPlan,
    meta: &VideoMetadata,
    codec: &OutputCodec,
) -> Vec<String> {
    let (out_w, out_h) = fit_dimensions(meta.width, meta.height, plan.max_dimension);
    let is_vp9 = codec.encoder == "libvpx-vp9";
    let is_mp4 = codec.container == "mp4";

    log::debug!(
        target: "fitvid::encode",
        "Building FFmpeg command: codec={}, bitrate={}bps, {}x{}@{}fps, input={} -> output={}",
        codec.encoder,
        plan.video_bitrate_bps,
        out_w,
        out_h,
        plan.frame_rate,
        input_path,
        output_path
    );

    let mut args = vec![
        "-nostdin".to_string(),
        "-threads".to_string(),
        "0".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-i".to_string(),
        input_path.to_string(),
        "-c:v".to_string(),
        codec.encoder.to_string(),
    ];

    if meta.has_audio {
        args.extend([
            "-c:a".to_string(),
            codec.audio_encoder.to_string(),
            "-b:a".to_string(),
            format!("{}k", AUDIO_BITRATE_BPS / 1000),
        ]);
    } else {
        args.push("-an".to_string());
    }

    args.extend([
        "-vf".to_string(),
        format!("scale={}:{}", out_w, out_h),
        "-r".to_string(),
        plan.frame_rate.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
    ]);

    if is_vp9 {
        args.extend([
            "-deadline".to_string(),
            "good".to_string(),
            "-cpu-used".to_string(),
            "4".to_string(),
            "-row-mt".to_string(),
            "1".to_string(),
        ]);
    }
    if is_mp4 {
        args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    }

    args.extend([
        "-b:v".to_string(),
        plan.video_bitrate_bps.to_string(),
        "-maxrate".to_string(),
        plan.video_bitrate_bps.to_string(),
        "-bufsize".to_string(),
        (plan.video_bitrate_bps * 2).to_string(),
    ]);

    args.push(output_path.to_string());
    args
}

/// Run one encode attempt. Returns the output as a `TempFile` (deleted on
/// drop unless the caller persists it) so a rejected attempt leaves nothing
/// behind.
pub fn encode_attempt(
    input: &std::path::Path,
    meta: &VideoMetadata,
    plan: &CompressionPlan,
    codec: &'static OutputCodec,
    cancel: &CancelToken,
    progress_callback: Option<Arc<dyn Fn(f64) + Send + Sync>>,
) -> Result<TempFile, MediaError> {
    if meta.duration <= 0.0 {
        return Err(MediaError::from("source reported zero duration"));
    }

    let output = TempFile::with_extension(codec.extension)?;
    let args = build_compress_args(
        &path_to_string(input),
        &path_to_string(output.path()),
        plan,
        meta,
        codec,
    );

    let deadline = Duration::from_secs_f64(
        meta.duration * ENCODE_DEADLINE_FACTOR + ENCODE_DEADLINE_SLACK_SECS,
    );
    run_ffmpeg(
        args,
        RunOptions {
            duration_hint: Some(meta.duration),
            timeout: Some(deadline),
            cancel: Some(cancel.clone()),
            progress_callback,
        },
    )
    .map_err(|e| match e {
        // A hung encode is an encoder failure, not a user-visible timeout class.
        MediaError::Timeout => MediaError::from("encoder did not complete within the deadline"),
        other => other,
    })?;

    Ok(output)
}
