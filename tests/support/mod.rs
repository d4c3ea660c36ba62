#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use fitvid::ffmpeg::discovery::get_ffmpeg_path;

/// Resolve FFmpeg, or None when the host has no usable install. Callers skip
/// the test in that case instead of failing CI machines without FFmpeg.
pub fn ffmpeg_or_skip() -> Option<PathBuf> {
    match get_ffmpeg_path() {
        Ok(path) => Some(path.to_path_buf()),
        Err(e) => {
            eprintln!("skipping: FFmpeg not available ({})", e);
            None
        }
    }
}

pub struct IntegrationEnv {
    pub ffmpeg: PathBuf,
    dir: tempfile::TempDir,
}

impl IntegrationEnv {
    /// None when FFmpeg is missing; tests bail out quietly.
    pub fn new() -> Option<Self> {
        let ffmpeg = ffmpeg_or_skip()?;
        let dir = tempfile::tempdir().expect("tempdir");
        Some(Self { ffmpeg, dir })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Synthesize a short H.264 clip from the `testsrc` pattern, with a sine
    /// tone audio track when requested.
    pub fn with_test_video(&self, name: &str, duration_secs: f32, with_audio: bool) -> PathBuf {
        let output_path = self.path(name);
        let status = create_test_video(&self.ffmpeg, &output_path, duration_secs, with_audio)
            .expect("failed to spawn ffmpeg for fixture");
        assert!(status.success(), "ffmpeg failed to create test video");
        assert!(output_path.exists());
        output_path
    }
}

fn create_test_video(
    ffmpeg: &Path,
    output_path: &Path,
    duration_secs: f32,
    with_audio: bool,
) -> std::io::Result<std::process::ExitStatus> {
    let video_src = format!(
        "testsrc=duration={}:size=640x360:rate=30",
        duration_secs
    );
    let mut args: Vec<String> = vec![
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-f".into(),
        "lavfi".into(),
        "-i".into(),
        video_src,
    ];
    if with_audio {
        args.extend([
            "-f".into(),
            "lavfi".into(),
            "-i".into(),
            format!("sine=frequency=440:duration={}", duration_secs),
            "-c:a".into(),
            "aac".into(),
            "-shortest".into(),
        ]);
    }
    args.extend([
        "-c:v".into(),
        "libx264".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        output_path.to_string_lossy().into_owned(),
    ]);

    Command::new(ffmpeg)
        .args(&args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
}
