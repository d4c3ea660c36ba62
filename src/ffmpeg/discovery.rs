//! FFmpeg/ffprobe binary resolution and encoder availability probing.
//!
//! Paths are resolved once and cached for the process lifetime. Encoder
//! availability is likewise probed once: codec support is static for a given
//! FFmpeg binary, so re-probing per call buys nothing.

use crate::error::MediaError;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

#[cfg(target_os = "windows")]
fn find_in_path() -> Option<PathBuf> {
    let output = Command::new("where").arg("ffmpeg").output().ok()?;
    if output.status.success() {
        let path = String::from_utf8_lossy(&output.stdout);
        let first = path.lines().next()?.trim();
        if !first.is_empty() {
            return Some(PathBuf::from(first));
        }
    }
    None
}

#[cfg(not(target_os = "windows"))]
fn find_in_path() -> Option<PathBuf> {
    let output = Command::new("which").arg("ffmpeg").output().ok()?;
    if output.status.success() {
        let path = String::from_utf8_lossy(&output.stdout);
        let first = path.lines().next()?.trim();
        if !first.is_empty() {
            return Some(PathBuf::from(first));
        }
    }
    None
}

fn common_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/opt/homebrew/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/opt/local/bin/ffmpeg"),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from("C:\\ffmpeg\\bin\\ffmpeg.exe"),
            PathBuf::from("C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe"),
        ]
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        vec![
            PathBuf::from("/usr/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffmpeg"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", unix)))]
    {
        vec![]
    }
}

static FFMPEG_PATH_CACHE: OnceLock<PathBuf> = OnceLock::new();
static AVAILABLE_ENCODERS_CACHE: OnceLock<Vec<String>> = OnceLock::new();

fn resolve_ffmpeg_path() -> Result<PathBuf, MediaError> {
    // Common paths first to avoid spawning which/where
    for path in common_paths() {
        if path.exists() {
            log::debug!(
                target: "fitvid::ffmpeg::discovery",
                "FFmpeg found in common path: {}",
                path.display()
            );
            return Ok(path);
        }
    }

    if let Some(p) = find_in_path() {
        if p.exists() {
            log::debug!(
                target: "fitvid::ffmpeg::discovery",
                "FFmpeg found in PATH: {}",
                p.display()
            );
            return Ok(p);
        }
    }

    log::error!(
        target: "fitvid::ffmpeg::discovery",
        "FFmpeg not found in PATH or common locations"
    );
    Err(MediaError::FfmpegNotFound(
        "FFmpeg not found. Please install FFmpeg on your system:\n  - macOS: brew install ffmpeg\n  - Linux: sudo apt install ffmpeg\n  - Windows: Download from https://ffmpeg.org/download.html"
            .to_string(),
    ))
}

/// Get FFmpeg path. Cached for process lifetime.
/// Env override: FFMPEG_PATH takes precedence (for tests/CI).
pub fn get_ffmpeg_path() -> Result<&'static Path, MediaError> {
    if let Some(path) = FFMPEG_PATH_CACHE.get() {
        return Ok(path.as_path());
    }
    let path = if let Ok(env_path) = std::env::var("FFMPEG_PATH") {
        let p = PathBuf::from(&env_path);
        if p.exists() {
            log::debug!(
                target: "fitvid::ffmpeg::discovery",
                "FFmpeg path from FFMPEG_PATH env: {}",
                p.display()
            );
            p
        } else {
            resolve_ffmpeg_path()?
        }
    } else {
        resolve_ffmpeg_path()?
    };
    // Another thread may have initialized first; keep whichever won.
    let _ = FFMPEG_PATH_CACHE.set(path);
    Ok(FFMPEG_PATH_CACHE
        .get()
        .expect("ffmpeg path cache initialized above")
        .as_path())
}

/// Paths to try for ffprobe given an ffmpeg binary path (suffixed first, then plain).
/// Split out so the derivation logic is unit-testable.
pub fn ffprobe_candidates(ffmpeg_path: &Path) -> Vec<PathBuf> {
    let parent = match ffmpeg_path.parent() {
        Some(p) => p,
        None => return vec![],
    };
    let mut candidates = Vec::with_capacity(2);
    let stem = ffmpeg_path.file_stem().and_then(|s| s.to_str());
    if let Some(stem) = stem {
        if let Some(suffix) = stem.strip_prefix("ffmpeg") {
            if !suffix.is_empty() {
                #[cfg(target_os = "windows")]
                candidates.push(parent.join(format!("ffprobe{suffix}.exe")));
                #[cfg(not(target_os = "windows"))]
                candidates.push(parent.join(format!("ffprobe{suffix}")));
            }
        }
    }
    #[cfg(target_os = "windows")]
    candidates.push(parent.join("ffprobe.exe"));
    #[cfg(not(target_os = "windows"))]
    candidates.push(parent.join("ffprobe"));
    candidates
}

/// Get ffprobe path. Same directory as ffmpeg (the two ship together).
pub fn get_ffprobe_path() -> Result<PathBuf, MediaError> {
    let ffmpeg = get_ffmpeg_path()?;
    let parent = ffmpeg
        .parent()
        .ok_or_else(|| MediaError::from("FFmpeg path has no parent directory".to_string()))?;
    for candidate in ffprobe_candidates(ffmpeg) {
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    #[cfg(target_os = "windows")]
    let ffprobe = parent.join("ffprobe.exe");
    #[cfg(not(target_os = "windows"))]
    let ffprobe = parent.join("ffprobe");
    Err(MediaError::from(format!(
        "ffprobe not found at {} (FFmpeg dir: {})",
        ffprobe.display(),
        parent.display()
    )))
}

/// Encoder names we ever care to look for in `ffmpeg -encoders` output.
const PROBED_ENCODERS: &[&str] = &[
    "libvpx-vp9",
    "libx264",
    "mpeg4",
    "libopus",
    "aac",
];

/// Parse `ffmpeg -encoders` output, returning which of `candidates` are present.
///
/// Encoder lines look like ` V....D libx264              H.264 / AVC ...`;
/// the name is the second whitespace-separated field.
pub fn parse_encoders_output(output: &str, candidates: &[&str]) -> Vec<String> {
    let mut found = Vec::new();
    for line in output.lines() {
        let mut fields = line.split_whitespace();
        let flags = match fields.next() {
            Some(f) => f,
            None => continue,
        };
        // Flag column starts with the codec type letter (V/A/S).
        if !flags.starts_with(['V', 'A', 'S']) {
            continue;
        }
        if let Some(name) = fields.next() {
            if candidates.contains(&name) && !found.iter().any(|f| f == name) {
                found.push(name.to_string());
            }
        }
    }
    found
}

/// Encoders available in the resolved FFmpeg build. Probed once per process.
pub fn get_available_encoders() -> Result<&'static [String], MediaError> {
    if let Some(list) = AVAILABLE_ENCODERS_CACHE.get() {
        return Ok(list.as_slice());
    }
    let ffmpeg = get_ffmpeg_path()?;
    let output = Command::new(ffmpeg)
        .args(["-hide_banner", "-encoders"])
        .output()
        .map_err(|e| MediaError::from(format!("Failed to run ffmpeg -encoders: {}", e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::from(format!(
            "ffmpeg -encoders failed: {}",
            stderr.trim()
        )));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let found = parse_encoders_output(&stdout, PROBED_ENCODERS);
    log::debug!(
        target: "fitvid::ffmpeg::discovery",
        "Available encoders: {:?}",
        found
    );
    let _ = AVAILABLE_ENCODERS_CACHE.set(found);
    Ok(AVAILABLE_ENCODERS_CACHE
        .get()
        .expect("encoder cache initialized above")
        .as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ffprobe_candidates_plain_ffmpeg() {
        #[cfg(not(target_os = "windows"))]
        {
            let candidates = ffprobe_candidates(Path::new("/usr/bin/ffmpeg"));
            assert_eq!(candidates.len(), 1);
            assert_eq!(candidates[0], PathBuf::from("/usr/bin/ffprobe"));
        }
        #[cfg(target_os = "windows")]
        {
            let candidates = ffprobe_candidates(Path::new("C:\\bin\\ffmpeg.exe"));
            assert_eq!(candidates.len(), 1);
            assert_eq!(candidates[0], PathBuf::from("C:\\bin\\ffprobe.exe"));
        }
    }

    #[test]
    fn ffprobe_candidates_suffixed_binary() {
        #[cfg(not(target_os = "windows"))]
        {
            let candidates = ffprobe_candidates(Path::new("/app/bin/ffmpeg-static"));
            assert_eq!(candidates.len(), 2);
            assert_eq!(candidates[0], PathBuf::from("/app/bin/ffprobe-static"));
            assert_eq!(candidates[1], PathBuf::from("/app/bin/ffprobe"));
        }
    }

    #[test]
    fn parse_encoders_picks_up_known_names() {
        let output = "\
Encoders:
 V..... = Video
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC (codec h264)
 V....D libvpx-vp9           libvpx VP9 (codec vp9)
 V....D mpeg4                MPEG-4 part 2
 A....D aac                  AAC (Advanced Audio Coding)
 A....D libopus              libopus Opus
";
        let found =
            parse_encoders_output(output, &["libx264", "libvpx-vp9", "mpeg4", "aac", "libopus"]);
        assert_eq!(found.len(), 5);
        assert!(found.contains(&"libvpx-vp9".to_string()));
        assert!(found.contains(&"aac".to_string()));
    }

    #[test]
    fn parse_encoders_ignores_header_and_unknown() {
        let output = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx265              libx265 H.265 / HEVC
";
        let found = parse_encoders_output(output, &["libx264", "aac"]);
        assert!(found.is_empty());
    }

    #[test]
    fn parse_encoders_deduplicates() {
        let output = " V....D libx264 one\n V....D libx264 two\n";
        let found = parse_encoders_output(output, &["libx264"]);
        assert_eq!(found, vec!["libx264".to_string()]);
    }
}
