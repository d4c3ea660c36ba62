pub mod discovery;
pub mod ffprobe;
mod progress;
mod runner;
pub mod temp;

pub use progress::ProgressTracker;
pub use runner::{RunOptions, run_ffmpeg};

/// Path to string for FFmpeg args or logging.
pub fn path_to_string(path: &(impl AsRef<std::path::Path> + ?Sized)) -> String {
    path.as_ref().to_string_lossy().to_string()
}
