//! Progress tracking across FFmpeg's output streams.
//!
//! With `-progress pipe:1` the counters arrive on stdout, but the source
//! duration needed to normalize them is printed on stderr. Both reader
//! threads feed the same `ProgressTracker`, which holds the duration in
//! shared atomic state.

use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use regex::Regex;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Duration: (\d+):(\d+):([\d.]+)").expect("invalid duration regex"));
static OUT_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"out_time_ms=(\d+)").expect("invalid out_time regex"));

/// AtomicU64 cannot hold Option<f64>; u64::MAX bits mean "not yet known".
const UNKNOWN_DURATION_BITS: u64 = u64::MAX;

/// Normalizes FFmpeg output lines into a 0..1 progress fraction.
///
/// Clones share state, so one tracker serves both the stdout and stderr
/// readers of a single FFmpeg run. The duration can be seeded from ffprobe
/// metadata; otherwise it is picked up from FFmpeg's own `Duration:` line.
#[derive(Clone)]
pub struct ProgressTracker {
    duration_bits: Arc<AtomicU64>,
}

impl ProgressTracker {
    pub fn new(duration_hint: Option<f64>) -> Self {
        let bits = duration_hint
            .filter(|&d| d > 0.0)
            .map(f64::to_bits)
            .unwrap_or(UNKNOWN_DURATION_BITS);
        Self {
            duration_bits: Arc::new(AtomicU64::new(bits)),
        }
    }

    fn duration(&self) -> Option<f64> {
        match self.duration_bits.load(Ordering::Relaxed) {
            UNKNOWN_DURATION_BITS => None,
            bits => Some(f64::from_bits(bits)),
        }
    }

    /// Feed one output line. Returns progress in [0, 1] when the line carries
    /// an `out_time_ms=` counter and the duration is known.
    pub fn observe(&self, line: &str) -> Option<f64> {
        if let Some(caps) = DURATION_RE.captures(line) {
            let hours: f64 = caps[1].parse().unwrap_or(0.0);
            let minutes: f64 = caps[2].parse().unwrap_or(0.0);
            let seconds: f64 = caps[3].parse().unwrap_or(0.0);
            let duration = hours * 3600.0 + minutes * 60.0 + seconds;
            if duration > 0.0 {
                self.duration_bits
                    .store(duration.to_bits(), Ordering::Relaxed);
            }
            return None;
        }

        let caps = OUT_TIME_RE.captures(line)?;
        let duration = self.duration()?;
        // out_time_ms is microseconds despite the name.
        let out_time_us: u64 = caps[1].parse().unwrap_or(0);
        let current_time = out_time_us as f64 / 1_000_000.0;
        Some((current_time / duration).min(1.0))
    }
}
