//! Compression parameter planning.
//!
//! Pure tier selection: from the source byte size and the attempt number,
//! pick the video bitrate, max output dimension, and frame rate for one
//! encode attempt. Planning is cheap; encodes run at roughly wall-clock
//! speed, so the tiers are deliberately aggressive to hit the size budget
//! in as few attempts as possible.

use serde::Serialize;

/// Hard cap on encode attempts per compression request.
pub const MAX_ATTEMPTS: u32 = 3;
/// Never retry once the plan bitrate is at or below this floor.
pub const MIN_RETRY_BITRATE_BPS: u32 = 500_000;
/// Each retry narrows the requested max dimension by this much.
pub const RETRY_DIMENSION_STEP: u32 = 200;
/// Narrowing never goes below this.
pub const MIN_DIMENSION: u32 = 480;
/// Audio is a minor contributor to total size and is not tiered.
pub const AUDIO_BITRATE_BPS: u32 = 96_000;

const MIB: f64 = 1024.0 * 1024.0;

/// Encode parameters for a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionPlan {
    pub video_bitrate_bps: u32,
    pub max_dimension: u32,
    pub frame_rate: u32,
}

struct Tier {
    min_source_mb: f64,
    bitrate_bps: u32,
    max_dimension: u32,
    frame_rate: u32,
}

// Most aggressive row first; the first matching row wins. A retry always
// takes the top row regardless of source size.
const TIERS: &[Tier] = &[
    Tier { min_source_mb: 300.0, bitrate_bps: 800_000, max_dimension: 720, frame_rate: 24 },
    Tier { min_source_mb: 200.0, bitrate_bps: 1_200_000, max_dimension: 960, frame_rate: 24 },
    Tier { min_source_mb: 100.0, bitrate_bps: 2_000_000, max_dimension: 1280, frame_rate: 24 },
    Tier { min_source_mb: 50.0, bitrate_bps: 3_000_000, max_dimension: 1600, frame_rate: 30 },
];

const BASE_BITRATE_BPS: u32 = 4_000_000;
const BASE_FRAME_RATE: u32 = 30;

/// Select the plan for one attempt. Deterministic, no I/O.
///
/// `requested_max_dimension` is the caller's ceiling (narrowed between
/// retries); the effective dimension is the smaller of it and the tier's.
pub fn plan_for_attempt(
    source_size_bytes: u64,
    attempt: u32,
    requested_max_dimension: u32,
) -> CompressionPlan {
    let source_mb = source_size_bytes as f64 / MIB;

    if attempt > 1 || source_mb > TIERS[0].min_source_mb {
        let t = &TIERS[0];
        return CompressionPlan {
            video_bitrate_bps: t.bitrate_bps,
            max_dimension: t.max_dimension.min(requested_max_dimension),
            frame_rate: t.frame_rate,
        };
    }
    for t in &TIERS[1..] {
        if source_mb > t.min_source_mb {
            return CompressionPlan {
                video_bitrate_bps: t.bitrate_bps,
                max_dimension: t.max_dimension.min(requested_max_dimension),
                frame_rate: t.frame_rate,
            };
        }
    }
    CompressionPlan {
        video_bitrate_bps: BASE_BITRATE_BPS,
        max_dimension: requested_max_dimension,
        frame_rate: BASE_FRAME_RATE,
    }
}

/// Dimension ceiling for the next retry: step down, floored at 480.
pub fn narrowed_max_dimension(previous: u32) -> u32 {
    previous.saturating_sub(RETRY_DIMENSION_STEP).max(MIN_DIMENSION)
}

/// Retry only while attempts remain and the bitrate is above the usable floor.
pub fn should_retry(attempt: u32, plan: &CompressionPlan) -> bool {
    attempt < MAX_ATTEMPTS && plan.video_bitrate_bps > MIN_RETRY_BITRATE_BPS
}
