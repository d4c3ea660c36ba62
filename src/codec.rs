//! Output codec selection.
//!
//! Codec availability depends on how the local FFmpeg was built, so it is
//! probed, never assumed. The preference list is ordered best-first: VP9 with
//! Opus in WebM (what the original recordings use), H.264 with AAC in MP4,
//! and finally FFmpeg's built-in MPEG-4 encoder, which every build carries.

use crate::error::MediaError;
use crate::ffmpeg::discovery::get_available_encoders;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputCodec {
    pub encoder: &'static str,
    pub audio_encoder: &'static str,
    pub container: &'static str,
    pub extension: &'static str,
    pub mime_type: &'static str,
}

pub const CODEC_PREFERENCE: &[OutputCodec] = &[
    OutputCodec {
        encoder: "libvpx-vp9",
        audio_encoder: "libopus",
        container: "webm",
        extension: "webm",
        mime_type: "video/webm",
    },
    OutputCodec {
        encoder: "libx264",
        audio_encoder: "aac",
        container: "mp4",
        extension: "mp4",
        mime_type: "video/mp4",
    },
    OutputCodec {
        encoder: "mpeg4",
        audio_encoder: "aac",
        container: "mp4",
        extension: "mp4",
        mime_type: "video/mp4",
    },
];

/// First preference whose video and audio encoders are both available.
pub fn select_output_codec(available: &[String]) -> Result<&'static OutputCodec, MediaError> {
    for codec in CODEC_PREFERENCE {
        let has = |name: &str| available.iter().any(|a| a == name);
        if has(codec.encoder) && has(codec.audio_encoder) {
            return Ok(codec);
        }
    }
    Err(MediaError::from(
        "No supported video codecs found in FFmpeg. Please ensure FFmpeg is properly installed with codec support.",
    ))
}

static SELECTED_CODEC: OnceLock<Result<&'static OutputCodec, String>> = OnceLock::new();

/// Output codec for this process. Availability is static for the lifetime of
/// the resolved FFmpeg binary, so the choice is made once.
pub fn preferred_output_codec() -> Result<&'static OutputCodec, MediaError> {
    let cached = SELECTED_CODEC.get_or_init(|| {
        let available = get_available_encoders().map_err(|e| e.to_string())?;
        let codec = select_output_codec(available).map_err(|e| e.to_string())?;
        log::info!(
            target: "fitvid::codec",
            "Selected output codec: {} + {} ({})",
            codec.encoder,
            codec.audio_encoder,
            codec.container
        );
        Ok(codec)
    });
    match cached {
        Ok(codec) => Ok(codec),
        Err(msg) => Err(MediaError::from(msg.clone())),
    }
}
