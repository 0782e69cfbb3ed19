use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Files at or above this size are fingerprinted instead of fully hashed.
pub const LARGE_FILE_THRESHOLD: usize = 1024 * 1024;

/// Bytes sampled from each end of a large file for its fingerprint.
const LARGE_FILE_SAMPLE: usize = 8 * 1024;

/// Bumped whenever the manifest schema changes shape; a mismatch forces a
/// full rescan.
pub const MANIFEST_FORMAT_VERSION: u32 = 2;

/// How a file's content hash was computed. Recorded per entry so a future
/// algorithm change invalidates stale hashes instead of silently matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "sha256-16")]
    Sha256Short,
    #[serde(rename = "sha256-16-large")]
    Sha256ShortLarge,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256Short => "sha256-16",
            HashAlgorithm::Sha256ShortLarge => "sha256-16-large",
        }
    }
}

/// Computes the 16-character content hash for a file.
///
/// Files under 1 MiB hash the full bytes: `sha256(bytes)[0..16]`. Larger
/// files hash a fingerprint of the first and last 8 KiB plus the decimal
/// size, prefixed with `"L"`: `"L" + sha256(head || tail || size)[0..15]`.
pub fn compute_content_hash(bytes: &[u8]) -> (String, HashAlgorithm) {
    if bytes.len() < LARGE_FILE_THRESHOLD {
        let digest = Sha256::digest(bytes);
        (format!("{:x}", digest)[..16].to_string(), HashAlgorithm::Sha256Short)
    } else {
        let head = &bytes[..LARGE_FILE_SAMPLE];
        let tail = &bytes[bytes.len() - LARGE_FILE_SAMPLE..];
        let mut hasher = Sha256::new();
        hasher.update(head);
        hasher.update(tail);
        hasher.update(bytes.len().to_string().as_bytes());
        let digest = hasher.finalize();
        (
            format!("L{}", &format!("{:x}", digest)[..15]),
            HashAlgorithm::Sha256ShortLarge,
        )
    }
}

/// One file's inventory record in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub path: String,
    pub content_hash: String,
    pub chunk_count: u32,
    pub last_indexed: DateTime<Utc>,
    pub hash_algorithm: HashAlgorithm,
}

impl FileEntry {
    pub fn new(
        path: impl Into<String>,
        content_hash: impl Into<String>,
        chunk_count: u32,
        hash_algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            path: path.into(),
            content_hash: content_hash.into(),
            chunk_count,
            last_indexed: Utc::now(),
            hash_algorithm,
        }
    }
}

/// Content-addressed inventory mapping workspace paths to their hashes.
///
/// Ownership: the `ManifestManager` exclusively mutates entries inside a
/// transaction; everyone else works on immutable snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub format_version: u32,
    pub entries: BTreeMap<String, FileEntry>,
}

impl Manifest {
    pub fn empty() -> Self {
        Self {
            format_version: MANIFEST_FORMAT_VERSION,
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_chunks(&self) -> u64 {
        self.entries.values().map(|e| e.chunk_count as u64).sum()
    }

    /// True when this manifest was written by an incompatible schema or
    /// hashing scheme and every file must be treated as changed.
    pub fn needs_full_rescan(&self) -> bool {
        self.format_version != MANIFEST_FORMAT_VERSION
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_file_hash_is_truncated_sha256() {
        let content = b"export const x = 1;";
        let (hash, algorithm) = compute_content_hash(content);

        let full = format!("{:x}", Sha256::digest(content));
        assert_eq!(hash, full[..16]);
        assert_eq!(hash.len(), 16);
        assert_eq!(algorithm, HashAlgorithm::Sha256Short);
    }

    #[test]
    fn test_hash_is_stable_for_identical_content() {
        let content = b"fn main() {}";
        assert_eq!(compute_content_hash(content), compute_content_hash(content));
    }

    #[test]
    fn test_large_file_hash_has_l_prefix() {
        let bytes = vec![7u8; LARGE_FILE_THRESHOLD];
        let (hash, algorithm) = compute_content_hash(&bytes);

        assert!(hash.starts_with('L'));
        assert_eq!(hash.len(), 16);
        assert_eq!(algorithm, HashAlgorithm::Sha256ShortLarge);

        let mut hasher = Sha256::new();
        hasher.update(&bytes[..8192]);
        hasher.update(&bytes[bytes.len() - 8192..]);
        hasher.update(bytes.len().to_string().as_bytes());
        let expected = format!("L{}", &format!("{:x}", hasher.finalize())[..15]);
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_large_file_fingerprint_detects_edge_mutations() {
        let mut bytes = vec![7u8; LARGE_FILE_THRESHOLD + 10];
        let (original, _) = compute_content_hash(&bytes);

        bytes[0] = 8;
        let (mutated_head, _) = compute_content_hash(&bytes);
        assert_ne!(original, mutated_head);

        bytes[0] = 7;
        let last = bytes.len() - 1;
        bytes[last] = 8;
        let (mutated_tail, _) = compute_content_hash(&bytes);
        assert_ne!(original, mutated_tail);
    }

    #[test]
    fn test_manifest_rescan_on_format_mismatch() {
        let mut manifest = Manifest::empty();
        assert!(!manifest.needs_full_rescan());
        manifest.format_version = 1;
        assert!(manifest.needs_full_rescan());
    }

    #[test]
    fn test_manifest_totals() {
        let mut manifest = Manifest::empty();
        manifest.entries.insert(
            "a.ts".to_string(),
            FileEntry::new("a.ts", "aaaa", 3, HashAlgorithm::Sha256Short),
        );
        manifest.entries.insert(
            "b.ts".to_string(),
            FileEntry::new("b.ts", "bbbb", 2, HashAlgorithm::Sha256Short),
        );
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.total_chunks(), 5);
    }
}
