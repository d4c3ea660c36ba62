//! Error type for the compression and thumbnail pipelines.
//!
//! One enum covers the whole taxonomy: probe failures are `MediaLoad`,
//! encoder failures are `Encode`, a size budget missed after all retries is
//! `SizeExceeded`, and thumbnail failures are `Thumbnail`. Thumbnail errors
//! are intended to be non-fatal to callers (upload proceeds without one).

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    FfmpegNotFound(String),

    #[error("Error loading video metadata: {0}")]
    MediaLoad(String),

    #[error("Encoding failed (code {code}): {stderr}")]
    Encode { code: i32, stderr: String },

    #[error(
        "Video still too large after compression: {achieved_mb:.1}MB (target: {target_mb}MB). \
         Try a shorter video or lower resolution source."
    )]
    SizeExceeded { achieved_mb: f64, target_mb: f64 },

    #[error("{0}")]
    Thumbnail(String),

    #[error("Video too long: {duration_secs:.0}s (limit: {limit_secs:.0}s)")]
    TooLong { duration_secs: f64, limit_secs: f64 },

    #[error("Operation timed out")]
    Timeout,

    #[error("Aborted")]
    Aborted,
}

impl MediaError {
    pub fn encode(code: i32, stderr: impl Into<String>) -> Self {
        Self::Encode {
            code,
            stderr: stderr.into(),
        }
    }

    pub fn size_exceeded(achieved_bytes: u64, target_mb: f64) -> Self {
        Self::SizeExceeded {
            achieved_mb: achieved_bytes as f64 / (1024.0 * 1024.0),
            target_mb,
        }
    }
}

impl serde::Serialize for MediaError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<String> for MediaError {
    fn from(s: String) -> Self {
        if s == "Aborted" {
            MediaError::Aborted
        } else {
            MediaError::Encode {
                code: -1,
                stderr: s,
            }
        }
    }
}

impl From<&str> for MediaError {
    fn from(s: &str) -> Self {
        s.to_string().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_exceeded_message_carries_achieved_and_target() {
        let e = MediaError::size_exceeded((15.2 * 1024.0 * 1024.0) as u64, 10.0);
        let msg = e.to_string();
        assert!(msg.contains("15.2MB"), "message was: {}", msg);
        assert!(msg.contains("(target: 10MB)"), "message was: {}", msg);
        assert!(msg.contains("shorter video"), "message was: {}", msg);
    }

    #[test]
    fn size_exceeded_fractional_target() {
        let e = MediaError::SizeExceeded {
            achieved_mb: 1.0,
            target_mb: 0.5,
        };
        assert!(e.to_string().contains("(target: 0.5MB)"));
    }

    #[test]
    fn media_load_message_prefix() {
        let e = MediaError::MediaLoad("no video stream".into());
        assert!(e.to_string().starts_with("Error loading video metadata"));
    }

    #[test]
    fn encode_constructor_keeps_code_and_stderr() {
        let e = MediaError::encode(1, "pixel format not supported");
        assert_eq!(
            e.to_string(),
            "Encoding failed (code 1): pixel format not supported"
        );
    }

    #[test]
    fn from_aborted_string() {
        let e = MediaError::from("Aborted");
        assert!(matches!(e, MediaError::Aborted));
    }

    #[test]
    fn from_other_string() {
        let e = MediaError::from("some error message");
        match &e {
            MediaError::Encode { code, stderr } => {
                assert_eq!(*code, -1);
                assert_eq!(stderr, "some error message");
            }
            _ => panic!("expected Encode"),
        }
    }
}
