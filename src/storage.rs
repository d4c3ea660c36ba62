//! Blob storage contract and upload orchestration.
//!
//! The actual store is external; this module defines the seam (`BlobStore`)
//! and the logic that names and pushes a prepared upload through it. The
//! video upload is the priority: a failed thumbnail upload is logged and the
//! result simply carries no thumbnail URL.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::MediaError;
use crate::upload::{PreparedUpload, PreparedVideo};

/// External blob store. `upload` must refuse to overwrite an existing path
/// (upsert=false semantics) and return the stored path.
pub trait BlobStore {
    fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, MediaError>;
    fn public_url(&self, path: &str) -> String;
}

/// Public URLs of the stored artifacts.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMedia {
    pub video_url: String,
    pub thumbnail_url: Option<String>,
}

/// Decode a `data:<mime>;base64,<payload>` URL into bytes.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, MediaError> {
    let payload = data_url
        .split_once(',')
        .map(|(_, p)| p)
        .ok_or_else(|| MediaError::Thumbnail("Invalid base64 data - no data after comma".to_string()))?;
    BASE64
        .decode(payload)
        .map_err(|e| MediaError::Thumbnail(format!("Invalid base64 data: {}", e)))
}

fn file_extension(video: &PreparedVideo) -> &str {
    match video {
        PreparedVideo::Compressed(c) => c.extension,
        PreparedVideo::Original { path, .. } => path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4"),
    }
}

fn content_type(video: &PreparedVideo) -> &str {
    match video {
        PreparedVideo::Compressed(c) => c.mime_type,
        PreparedVideo::Original { .. } => match file_extension(video) {
            "webm" => "video/webm",
            _ => "video/mp4",
        },
    }
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Upload the prepared video (and its thumbnail, when present) and return
/// their public URLs. Paths follow `videos/{name}_{ts}.{ext}` and
/// `thumbnails/{name}_{ts}.jpg`.
pub fn upload_prepared(
    store: &impl BlobStore,
    prepared: &PreparedUpload,
    base_name: &str,
) -> Result<UploadedMedia, MediaError> {
    let ts = timestamp_millis();
    let video_bytes = fs::read(prepared.video.path())?;
    let video_path = format!(
        "videos/{}_{}.{}",
        base_name,
        ts,
        file_extension(&prepared.video)
    );
    let stored = store.upload(&video_path, &video_bytes, content_type(&prepared.video))?;
    let video_url = store.public_url(&stored);

    let thumbnail_url = prepared.thumbnail.as_deref().and_then(|data_url| {
        let result = decode_data_url(data_url).and_then(|bytes| {
            let thumb_path = format!("thumbnails/{}_{}.jpg", base_name, ts);
            store.upload(&thumb_path, &bytes, "image/jpeg")
        });
        match result {
            Ok(path) => Some(store.public_url(&path)),
            Err(e) => {
                log::warn!(
                    target: "fitvid::storage",
                    "Thumbnail upload failed, continuing without one: {}",
                    e
                );
                None
            }
        }
    });

    Ok(UploadedMedia {
        video_url,
        thumbnail_url,
    })
}

#[allow(dead_code)]
fn _assert_object_safe(_: &dyn BlobStore) {}

/// Convenience for callers holding a loose video file rather than a
/// `PreparedUpload`.
pub fn upload_file(
    store: &impl BlobStore,
    video: &Path,
    content_type_hint: &str,
    base_name: &str,
) -> Result<String, MediaError> {
    let bytes = fs::read(video)?;
    let ext = video.extension().and_then(|e| e.to_str()).unwrap_or("mp4");
    let path = format!("videos/{}_{}.{}", base_name, timestamp_millis(), ext);
    let stored = store.upload(&path, &bytes, content_type_hint)?;
    Ok(store.public_url(&stored))
}
