//! Scoped temp files for encode outputs.
//!
//! Every attempt writes into a `TempFile`, which deletes itself on drop
//! unless the caller persists it. The retry loop can run several encode
//! cycles per user action, so rejected outputs must not pile up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Generates a short random suffix for temp filenames. Not cryptographically
/// secure; for uniqueness only.
fn random_alphanumeric_suffix(len: usize) -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    static STATE: AtomicU64 = AtomicU64::new(0);
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    let mut s = String::with_capacity(len);
    for i in 0..len {
        let n = STATE.fetch_add(seed.wrapping_add(i as u64) | 1, Ordering::Relaxed);
        s.push(CHARS[(n % CHARS.len() as u64) as usize] as char);
    }
    s
}

/// A file in the system temp dir, removed on drop unless persisted.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    keep: bool,
}

impl TempFile {
    /// Reserve a unique temp path with the given extension (e.g. "webm").
    /// The file itself is created by whoever writes to the path.
    pub fn with_extension(extension: &str) -> io::Result<Self> {
        let name = format!(
            "fitvid-{}-{}.{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map_err(|e| io::Error::other(e.to_string()))?
                .as_millis(),
            random_alphanumeric_suffix(9),
            extension
        );
        Ok(Self {
            path: std::env::temp_dir().join(name),
            keep: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Give up ownership of the file; it will no longer be deleted on drop.
    pub fn into_path(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.keep {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn is_cross_device_rename_error(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::CrossesDevices
}

/// Move `source` to `dest`, falling back to copy+remove when the temp dir
/// lives on a different filesystem than the destination.
pub fn persist_to(source: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            if is_cross_device_rename_error(&e) {
                fs::copy(source, dest)?;
                fs::remove_file(source)?;
                return Ok(());
            }
            Err(e)
        }
    }
}
