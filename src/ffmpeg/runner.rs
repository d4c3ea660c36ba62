//! FFmpeg process spawning, progress parsing, and lifetime control.
//!
//! Spawns FFmpeg as a child process, parses progress from stdout (pipe:1),
//! and drains stderr on a background thread. A watchdog thread kills the
//! child when a deadline passes or the caller's cancel token fires, so a
//! hung decode on malformed media cannot stall the pipeline and a user
//! navigating away does not leak the encoder.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(windows)]
use std::os::windows::process::CommandExt;

use parking_lot::Mutex;

use super::discovery::get_ffmpeg_path;
use super::progress::ProgressTracker;
use crate::cancel::CancelToken;
use crate::error::MediaError;

/// Minimum interval between progress callback invocations.
const PROGRESS_EMIT_INTERVAL: Duration = Duration::from_millis(150);
/// Keep only the last N bytes of stderr to avoid unbounded memory growth.
const MAX_STDERR_BYTES: usize = 64 * 1024;
/// Watchdog poll interval.
const WATCHDOG_POLL: Duration = Duration::from_millis(50);

/// Why the watchdog killed the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    TimedOut,
    Cancelled,
}

/// Per-invocation options for an FFmpeg run.
#[derive(Default)]
pub struct RunOptions {
    /// Known source duration; lets progress be computed before FFmpeg prints
    /// its own Duration line.
    pub duration_hint: Option<f64>,
    /// Hard wall-clock bound; the child is killed when it passes.
    pub timeout: Option<Duration>,
    /// Cooperative cancellation, polled by the watchdog.
    pub cancel: Option<CancelToken>,
    /// Receives normalized progress in [0, 1].
    pub progress_callback: Option<Arc<dyn Fn(f64) + Send + Sync>>,
}

struct ReadStreamConfig {
    collect_stderr: Option<Arc<Mutex<Vec<u8>>>>,
    tracker: ProgressTracker,
    progress_callback: Option<Arc<dyn Fn(f64) + Send + Sync>>,
}

fn read_stream<R: std::io::Read + Send + 'static>(
    reader: R,
    config: ReadStreamConfig,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last_emit = Instant::now();
        let mut last_progress = 0.0_f64;
        let mut stream_reader = BufReader::new(reader);
        let mut line_buf = Vec::with_capacity(256);
        while stream_reader.read_until(b'\n', &mut line_buf).unwrap_or(0) > 0 {
            let line = std::str::from_utf8(&line_buf)
                .unwrap_or("")
                .trim_end_matches(['\n', '\r']);
            if let Some(ref buf) = config.collect_stderr {
                let mut guard = buf.lock();
                guard.extend_from_slice(line.as_bytes());
                guard.push(b'\n');
                if guard.len() > MAX_STDERR_BYTES {
                    let excess = guard.len() - MAX_STDERR_BYTES;
                    guard.drain(..excess);
                }
            }
            if let Some(p) = config.tracker.observe(line) {
                let now = Instant::now();
                let should_emit = now.duration_since(last_emit) >= PROGRESS_EMIT_INTERVAL
                    || (p - last_progress).abs() >= 0.01
                    || p >= 1.0;
                if should_emit {
                    last_emit = now;
                    last_progress = p;
                    if let Some(ref cb) = config.progress_callback {
                        cb(p);
                    }
                }
            }
            line_buf.clear();
        }
    })
}

/// Polls for timeout/cancel; on either, kills the child and records why.
/// Exits quietly once the main thread has taken the child back.
fn spawn_watchdog(
    child_slot: Arc<Mutex<Option<Child>>>,
    stop_reason: Arc<Mutex<Option<StopReason>>>,
    timeout: Option<Duration>,
    cancel: Option<CancelToken>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let started = Instant::now();
        loop {
            thread::sleep(WATCHDOG_POLL);
            let mut guard = child_slot.lock();
            let child = match guard.as_mut() {
                Some(c) => c,
                None => return, // run finished; nothing to guard
            };
            // Reap without blocking so a finished child releases the slot.
            if matches!(child.try_wait(), Ok(Some(_))) {
                return;
            }
            let reason = if cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                Some(StopReason::Cancelled)
            } else if timeout.is_some_and(|t| started.elapsed() >= t) {
                Some(StopReason::TimedOut)
            } else {
                None
            };
            if let Some(reason) = reason {
                log::warn!(
                    target: "fitvid::ffmpeg::runner",
                    "Killing FFmpeg process: {:?}",
                    reason
                );
                let mut child = guard.take().expect("child checked above");
                *stop_reason.lock() = Some(reason);
                drop(guard);
                let _ = child.kill();
                let _ = child.wait();
                return;
            }
        }
    })
}

/// Run FFmpeg and block until completion.
///
/// Returns `Encode { code, stderr }` on non-zero exit, `Timeout`/`Aborted`
/// when the watchdog killed the child, and `Ok(())` on success.
pub fn run_ffmpeg(args: Vec<String>, options: RunOptions) -> Result<(), MediaError> {
    let ffmpeg_path = get_ffmpeg_path()?;
    let path_str = ffmpeg_path.to_string_lossy();

    let input_arg = args
        .iter()
        .position(|a| a == "-i")
        .and_then(|i| args.get(i + 1));
    let output_arg = args.last();
    log::debug!(
        target: "fitvid::ffmpeg::runner",
        "Spawning FFmpeg: path={}, input={:?}, output={:?}",
        path_str,
        input_arg,
        output_arg
    );

    let mut cmd = Command::new(&*path_str);
    cmd.args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(windows)]
    cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW
    let mut child = cmd
        .spawn()
        .map_err(|e| MediaError::from(format!("Failed to spawn FFmpeg: {}", e)))?;

    let stdout = match child.stdout.take() {
        Some(s) => s,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(MediaError::from("Failed to capture stdout"));
        }
    };
    let stderr = match child.stderr.take() {
        Some(s) => s,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(MediaError::from("Failed to capture stderr"));
        }
    };

    let child_slot = Arc::new(Mutex::new(Some(child)));
    let stop_reason: Arc<Mutex<Option<StopReason>>> = Arc::new(Mutex::new(None));
    let watchdog = spawn_watchdog(
        Arc::clone(&child_slot),
        Arc::clone(&stop_reason),
        options.timeout,
        options.cancel,
    );

    let tracker = ProgressTracker::new(options.duration_hint);
    let stderr_buffer = Arc::new(Mutex::new(Vec::new()));

    let stdout_handle = read_stream(
        stdout,
        ReadStreamConfig {
            collect_stderr: None,
            tracker: tracker.clone(),
            progress_callback: options.progress_callback,
        },
    );
    let stderr_handle = read_stream(
        stderr,
        ReadStreamConfig {
            collect_stderr: Some(Arc::clone(&stderr_buffer)),
            tracker,
            progress_callback: None,
        },
    );

    let _ = stdout_handle.join();
    let _ = stderr_handle.join();

    let child = child_slot.lock().take();
    let status = match child {
        Some(mut c) => {
            let status = c.wait().map_err(|e| MediaError::from(e.to_string()))?;
            let _ = watchdog.join();
            status
        }
        None => {
            // Watchdog got there first.
            let _ = watchdog.join();
            let reason = stop_reason.lock().take();
            return match reason {
                Some(StopReason::TimedOut) => Err(MediaError::Timeout),
                _ => Err(MediaError::Aborted),
            };
        }
    };

    let stderr_bytes = stderr_buffer.lock().clone();
    let stderr_str = String::from_utf8_lossy(&stderr_bytes).to_string();

    if status.success() {
        log::info!(
            target: "fitvid::ffmpeg::runner",
            "FFmpeg completed successfully"
        );
        Ok(())
    } else {
        let code = status.code().unwrap_or(-1);
        let err_preview = stderr_str
            .lines()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .join("; ");
        log::error!(
            target: "fitvid::ffmpeg::runner",
            "FFmpeg failed (code={}): {}",
            code,
            err_preview
        );
        Err(MediaError::encode(code, stderr_str))
    }
}
