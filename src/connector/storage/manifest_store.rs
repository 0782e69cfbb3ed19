use std::path::PathBuf;

use tracing::{debug, warn};

use super::version::write_atomic;
use crate::domain::{FileEntry, LienError, Manifest};

/// Owns `manifest.json`: loads snapshots and commits transactions.
///
/// The manager is the only mutator of manifest entries. Readers always work
/// on the owned snapshot a [`load`](ManifestManager::load) returns, and a
/// transaction commits by atomically replacing the whole file (write temp,
/// rename) so a crash never leaves a half-written inventory.
pub struct ManifestManager {
    path: PathBuf,
}

impl ManifestManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the manifest snapshot. A missing file yields an empty manifest;
    /// an unreadable or incompatible one yields an empty manifest and forces
    /// the caller into a full rescan.
    pub fn load(&self) -> Manifest {
        if !self.path.exists() {
            return Manifest::empty();
        }
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("Manifest unreadable, forcing full rescan: {}", err);
                return Manifest::empty();
            }
        };
        match serde_json::from_str::<Manifest>(&raw) {
            Ok(manifest) if manifest.needs_full_rescan() => {
                warn!(
                    "Manifest format version {} is stale, forcing full rescan",
                    manifest.format_version
                );
                Manifest::empty()
            }
            Ok(manifest) => manifest,
            Err(err) => {
                warn!("Manifest corrupt, forcing full rescan: {}", err);
                Manifest::empty()
            }
        }
    }

    /// Commits a new manifest. Called only after every store write in the
    /// transaction succeeded.
    pub fn commit(&self, manifest: &Manifest) -> Result<(), LienError> {
        let json = serde_json::to_string_pretty(manifest)
            .map_err(|e| LienError::internal(format!("manifest serialization: {e}")))?;
        write_atomic(&self.path, json.as_bytes())?;
        debug!("Committed manifest with {} entries", manifest.len());
        Ok(())
    }

    /// Applies a reconciliation result to a snapshot: upserts for indexed
    /// files, removals for deleted ones.
    pub fn apply(
        manifest: &mut Manifest,
        indexed: Vec<FileEntry>,
        deleted: &[String],
    ) {
        for entry in indexed {
            manifest.entries.insert(entry.path.clone(), entry);
        }
        for path in deleted {
            manifest.entries.remove(path);
        }
    }
}
