//! Upload key generation shared by every backend.
//!
//! Key format: `{folder}/{timestamp_ms}-{random 0..=9999}-{file_name}`.
//!
//! Timestamps are strictly increasing within a process: a second key requested
//! in the same millisecond gets the next millisecond. Two keys built by one
//! process therefore never collide. Across processes the random suffix is the
//! only disambiguator, which leaves a small collision window for uploads of the
//! same file name in the same millisecond.

use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const MAX_FILE_NAME_LENGTH: usize = 255;
const FALLBACK_FILE_NAME: &str = "recording.webm";

static LAST_TIMESTAMP_MS: AtomicU64 = AtomicU64::new(0);

/// Object key under which one upload attempt is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadKey(String);

impl UploadKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Folder part of the key (everything before the last `/`).
    pub fn folder(&self) -> &str {
        self.0.rsplit_once('/').map(|(folder, _)| folder).unwrap_or("")
    }

    /// `{timestamp_ms}-{random}-{file_name}` part of the key.
    pub fn object_name(&self) -> &str {
        self.0.rsplit_once('/').map(|(_, name)| name).unwrap_or(&self.0)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for UploadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UploadKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Build a fresh key for `file_name` inside `folder`.
pub fn build_key(folder: &str, file_name: &str) -> UploadKey {
    let timestamp = next_timestamp_ms();
    let suffix: u16 = rand::rng().random_range(0..=9999);
    let name = sanitize_file_name(file_name);
    let folder = folder.trim_matches('/');

    if folder.is_empty() {
        UploadKey(format!("{}-{}-{}", timestamp, suffix, name))
    } else {
        UploadKey(format!("{}/{}-{}-{}", folder, timestamp, suffix, name))
    }
}

fn next_timestamp_ms() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let mut last = LAST_TIMESTAMP_MS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_TIMESTAMP_MS.compare_exchange_weak(
            last,
            next,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Keep only the base name and replace anything outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(file_name: &str) -> String {
    let base = std::path::Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);

    if base.contains("..") {
        return FALLBACK_FILE_NAME.to_string();
    }

    let sanitized: String = base
        .chars()
        .take(MAX_FILE_NAME_LENGTH)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches('_').is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_format() {
        let key = build_key("layers", "take1.webm");
        assert_eq!(key.folder(), "layers");

        let parts: Vec<&str> = key.object_name().splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].parse::<u64>().unwrap() > 1_600_000_000_000);
        assert!(parts[1].parse::<u16>().unwrap() <= 9999);
        assert_eq!(parts[2], "take1.webm");
    }

    #[test]
    fn test_folder_slashes_trimmed() {
        let key = build_key("/layers/", "a.wav");
        assert!(key.as_str().starts_with("layers/"));
        assert!(!key.as_str().contains("//"));
    }

    #[test]
    fn test_ten_thousand_keys_are_unique() {
        let keys: HashSet<UploadKey> = (0..10_000)
            .map(|_| build_key("layers", "take1.webm"))
            .collect();
        assert_eq!(keys.len(), 10_000);
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let a = next_timestamp_ms();
        let b = next_timestamp_ms();
        assert!(b > a);
    }

    #[test]
    fn test_file_name_sanitized() {
        assert_eq!(sanitize_file_name("my take (2).webm"), "my_take__2_.webm");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name(".."), FALLBACK_FILE_NAME);
        assert_eq!(sanitize_file_name(""), FALLBACK_FILE_NAME);
    }
}
