mod support;

use std::fs;

use serial_test::serial;

use fitvid::error::MediaError;
use fitvid::storage::decode_data_url;
use fitvid::upload::{PreparedVideo, UploadOptions};
use fitvid::{
    CancelToken, CompressionOptions, compress_video, generate_thumbnail, prepare_for_upload,
    probe_video,
};
use support::IntegrationEnv;

#[test]
#[serial]
fn probe_reports_fixture_metadata() {
    let Some(env) = IntegrationEnv::new() else {
        return;
    };
    let input = env.with_test_video("input.mp4", 2.0, true);

    let meta = probe_video(&input).expect("probe");
    assert_eq!(meta.width, 640);
    assert_eq!(meta.height, 360);
    assert!((meta.duration - 2.0).abs() < 0.5, "duration {}", meta.duration);
    assert!(meta.size > 0);
    assert!(meta.has_audio);
}

#[test]
#[serial]
fn probe_detects_missing_audio() {
    let Some(env) = IntegrationEnv::new() else {
        return;
    };
    let input = env.with_test_video("silent.mp4", 1.0, false);

    let meta = probe_video(&input).expect("probe");
    assert!(!meta.has_audio);
}

#[test]
#[serial]
fn compress_fits_generous_budget() {
    let Some(env) = IntegrationEnv::new() else {
        return;
    };
    let input = env.with_test_video("input.mp4", 2.0, true);
    let options = CompressionOptions {
        max_size_mb: 50.0,
        max_width_or_height: 480,
    };

    let compressed = compress_video(&input, &options, &CancelToken::new()).expect("compress");
    assert!(compressed.path.exists());
    assert!(compressed.size_bytes <= options.max_size_bytes());
    assert_eq!(
        fs::metadata(&compressed.path).expect("metadata").len(),
        compressed.size_bytes
    );

    // The output itself must probe cleanly, within the dimension ceiling and
    // with even dimensions.
    let out_meta = probe_video(&compressed.path).expect("probe output");
    assert!(out_meta.width.max(out_meta.height) <= 480);
    assert_eq!(out_meta.width % 2, 0);
    assert_eq!(out_meta.height % 2, 0);

    let dest = env.path(&format!("final.{}", compressed.extension));
    let compressed = compressed.persist(&dest).expect("persist");
    assert_eq!(compressed.path, dest);
    assert!(dest.exists());
}

#[test]
#[serial]
fn impossible_budget_fails_with_size_exceeded() {
    let Some(env) = IntegrationEnv::new() else {
        return;
    };
    let input = env.with_test_video("input.mp4", 2.0, true);
    let options = CompressionOptions {
        max_size_mb: 0.0001,
        max_width_or_height: 480,
    };

    let err = compress_video(&input, &options, &CancelToken::new())
        .expect_err("a fraction of a kilobyte is not encodable");
    assert!(matches!(err, MediaError::SizeExceeded { .. }), "{:?}", err);
    let message = err.to_string();
    assert!(message.contains("Video still too large after compression"), "{}", message);
    assert!(message.contains("Try a shorter video or lower resolution source"), "{}", message);
}

#[test]
#[serial]
fn cancelled_token_aborts_compression() {
    let Some(env) = IntegrationEnv::new() else {
        return;
    };
    let input = env.with_test_video("input.mp4", 2.0, true);
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = compress_video(&input, &CompressionOptions::default(), &cancel)
        .expect_err("cancelled before the first attempt");
    assert!(matches!(err, MediaError::Aborted), "{:?}", err);
}

#[test]
#[serial]
fn thumbnail_is_a_jpeg_data_url() {
    let Some(env) = IntegrationEnv::new() else {
        return;
    };
    let input = env.with_test_video("input.mp4", 2.0, true);

    let data_url = generate_thumbnail(&input, 1.0).expect("thumbnail");
    assert!(data_url.starts_with("data:image/jpeg;base64,"), "{}", &data_url[..40.min(data_url.len())]);

    let bytes = decode_data_url(&data_url).expect("decode");
    assert!(bytes.len() >= 100);
    // JPEG start-of-image marker
    assert_eq!(&bytes[..2], b"\xff\xd8");
}

#[test]
#[serial]
fn thumbnail_seek_past_end_is_clamped() {
    let Some(env) = IntegrationEnv::new() else {
        return;
    };
    let input = env.with_test_video("input.mp4", 1.0, false);

    // Requested capture time beyond the clip still yields a frame.
    let data_url = generate_thumbnail(&input, 30.0).expect("thumbnail");
    assert!(data_url.starts_with("data:image/jpeg;base64,"));
}

#[test]
#[serial]
fn prepare_for_upload_keeps_small_source_unchanged() {
    let Some(env) = IntegrationEnv::new() else {
        return;
    };
    // A 2 second testsrc clip is far under the 10MB default budget.
    let input = env.with_test_video("input.mp4", 2.0, true);

    let prepared =
        prepare_for_upload(&input, &UploadOptions::default(), &CancelToken::new()).expect("prepare");
    match &prepared.video {
        PreparedVideo::Original { path, size_bytes } => {
            assert_eq!(path, &input);
            assert_eq!(*size_bytes, fs::metadata(&input).expect("metadata").len());
        }
        PreparedVideo::Compressed(c) => panic!("unexpected compression: {:?}", c),
    }
    let thumb = prepared.thumbnail.expect("thumbnail");
    assert!(thumb.starts_with("data:image/jpeg;base64,"));
}

#[test]
#[serial]
fn prepare_for_upload_rejects_overlong_source() {
    let Some(env) = IntegrationEnv::new() else {
        return;
    };
    let input = env.with_test_video("input.mp4", 3.0, false);
    let options = UploadOptions {
        max_duration_secs: 1.0,
        ..Default::default()
    };

    let err = prepare_for_upload(&input, &options, &CancelToken::new())
        .expect_err("3s clip against a 1s ceiling");
    assert!(matches!(err, MediaError::TooLong { .. }), "{:?}", err);
}
