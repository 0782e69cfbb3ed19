use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use ignore::WalkBuilder;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::application::{ChunkRecord, Embedder, ReindexCoordinator, VectorStore};
use crate::connector::parsing::{is_template_path, Chunker};
use crate::connector::storage::ManifestManager;
use crate::domain::{
    compute_content_hash, FileEntry, HashAlgorithm, Language, LienError, Manifest,
};

/// Extensions indexed via line chunking even though no grammar covers them.
const PLAIN_TEXT_EXTENSIONS: &[&str] = &["md", "txt"];

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageStats {
    pub file_count: u64,
    pub chunk_count: u64,
}

/// What one reconciliation pass did. Per-file failures are collected here
/// alongside the successful counts; only transaction-level failures abort.
#[derive(Debug, Default)]
pub struct IndexOutcome {
    pub indexed_files: usize,
    pub deleted_files: usize,
    pub unchanged_files: usize,
    pub chunk_count: usize,
    pub language_stats: BTreeMap<String, LanguageStats>,
    pub errors: Vec<LienError>,
    pub duration_ms: u64,
}

impl IndexOutcome {
    pub fn did_work(&self) -> bool {
        self.indexed_files > 0 || self.deleted_files > 0
    }
}

enum PerFile {
    Unchanged(String),
    Gone(String),
    Prepared(Box<PreparedFile>),
    Failed(LienError),
}

struct PreparedFile {
    path: String,
    content_hash: String,
    hash_algorithm: HashAlgorithm,
    language: Language,
    records: Vec<ChunkRecord>,
}

/// Reconciles a set of files against the manifest and the vector store.
///
/// The flow follows the reconciliation protocol: partition against the
/// manifest snapshot, chunk and embed changed files (CPU work on the
/// blocking pool, bounded fan-out), then commit everything in one
/// transaction: per-file atomic `replace_file`/`delete_by_file` calls
/// followed by the atomic manifest write. The store bumps the version stamp
/// on each successful mutation; on transaction failure the manifest is never
/// written and the next run retries.
pub struct IndexWorkspaceUseCase {
    workspace_root: PathBuf,
    chunker: Arc<Chunker>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    manifest: Arc<ManifestManager>,
    coordinator: Arc<ReindexCoordinator>,
    repo_id: Option<String>,
    concurrency: usize,
    embedding_batch_size: usize,
}

impl IndexWorkspaceUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        chunker: Arc<Chunker>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        manifest: Arc<ManifestManager>,
        coordinator: Arc<ReindexCoordinator>,
        concurrency: usize,
        embedding_batch_size: usize,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            chunker,
            embedder,
            store,
            manifest,
            coordinator,
            repo_id: None,
            concurrency: concurrency.max(1),
            embedding_batch_size: embedding_batch_size.max(1),
        }
    }

    /// Tags every produced chunk with a repository id (multi-tenant
    /// deployments).
    pub fn with_repo_id(mut self, repo_id: impl Into<String>) -> Self {
        self.repo_id = Some(repo_id.into());
        self
    }

    /// Full-workspace pass: scan, reconcile, commit. `force` re-indexes
    /// every file regardless of manifest hashes.
    pub async fn execute(&self, force: bool) -> Result<IndexOutcome, LienError> {
        let candidates = self.scan_workspace();
        info!("Scanned {} indexable files", candidates.len());
        self.reconcile(candidates, Vec::new(), true, force).await
    }

    /// Targeted pass used by the change handler: `files` are hash-checked
    /// and reindexed when changed, `deleted` are removed outright. Paths
    /// outside the indexable set are dropped; deletions always go through.
    pub async fn index_files(
        &self,
        files: Vec<String>,
        deleted: Vec<String>,
    ) -> Result<IndexOutcome, LienError> {
        let files = files.into_iter().filter(|p| is_indexable(p)).collect();
        self.reconcile(files, deleted, false, false).await
    }

    async fn reconcile(
        &self,
        candidates: Vec<String>,
        explicit_deletes: Vec<String>,
        full_scan: bool,
        force: bool,
    ) -> Result<IndexOutcome, LienError> {
        let start = Instant::now();
        let snapshot = Arc::new(self.manifest.load());

        // Phase 1: hash, chunk, and embed changed files with bounded
        // parallelism. Pure-CPU chunking runs on the blocking pool.
        let results: Vec<PerFile> = stream::iter(candidates.iter().cloned())
            .map(|path| self.prepare_file(path, snapshot.clone(), force))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut outcome = IndexOutcome::default();
        let mut prepared: Vec<PreparedFile> = Vec::new();
        let mut deleted: BTreeSet<String> = explicit_deletes.into_iter().collect();

        for result in results {
            match result {
                PerFile::Unchanged(_) => outcome.unchanged_files += 1,
                PerFile::Gone(path) => {
                    if snapshot.get(&path).is_some() {
                        deleted.insert(path);
                    }
                }
                PerFile::Prepared(file) => prepared.push(*file),
                PerFile::Failed(err) => {
                    warn!("Skipping file: {}", err);
                    outcome.errors.push(err);
                }
            }
        }

        if full_scan {
            // Files in the manifest but absent from the scan were deleted.
            let scanned: BTreeSet<&String> = candidates.iter().collect();
            for path in snapshot.entries.keys() {
                if !scanned.contains(path) {
                    deleted.insert(path.clone());
                }
            }
        }
        // A path cannot be both replaced and deleted in one transaction.
        deleted.retain(|path| !prepared.iter().any(|p| &p.path == path));

        // Deterministic write order.
        prepared.sort_by(|a, b| a.path.cmp(&b.path));

        if prepared.is_empty() && deleted.is_empty() {
            outcome.duration_ms = start.elapsed().as_millis() as u64;
            debug!("Reconciliation found no work");
            return Ok(outcome);
        }

        // The guard fails the operation if this future is dropped mid-commit.
        let guard = self.coordinator.begin(
            prepared
                .iter()
                .map(|p| p.path.clone())
                .chain(deleted.iter().cloned()),
        );

        match self.commit(&mut outcome, prepared, &deleted, &snapshot).await {
            Ok(()) => {
                outcome.duration_ms = start.elapsed().as_millis() as u64;
                if let Some(guard) = guard {
                    guard.complete(outcome.duration_ms);
                }
                info!(
                    "Reindexed {} files (+{} deleted, {} unchanged, {} chunks) in {}ms",
                    outcome.indexed_files,
                    outcome.deleted_files,
                    outcome.unchanged_files,
                    outcome.chunk_count,
                    outcome.duration_ms
                );
                Ok(outcome)
            }
            Err(err) => {
                if let Some(guard) = guard {
                    guard.fail();
                }
                Err(err)
            }
        }
    }

    /// Phase 2: the manifest transaction. Store writes first; the manifest
    /// commits only after every one of them succeeded.
    async fn commit(
        &self,
        outcome: &mut IndexOutcome,
        prepared: Vec<PreparedFile>,
        deleted: &BTreeSet<String>,
        snapshot: &Manifest,
    ) -> Result<(), LienError> {
        let mut next = snapshot.clone();
        let mut entries = Vec::with_capacity(prepared.len());

        for file in prepared {
            self.store
                .replace_file(&file.path, file.records.clone())
                .await?;
            let stats = outcome
                .language_stats
                .entry(file.language.as_str().to_string())
                .or_default();
            stats.file_count += 1;
            stats.chunk_count += file.records.len() as u64;
            outcome.indexed_files += 1;
            outcome.chunk_count += file.records.len();
            entries.push(FileEntry::new(
                file.path,
                file.content_hash,
                file.records.len() as u32,
                file.hash_algorithm,
            ));
        }

        for path in deleted {
            self.store.delete_by_file(path).await?;
            outcome.deleted_files += 1;
        }

        let deleted_paths: Vec<String> = deleted.iter().cloned().collect();
        ManifestManager::apply(&mut next, entries, &deleted_paths);
        self.manifest.commit(&next)?;
        Ok(())
    }

    async fn prepare_file(&self, path: String, snapshot: Arc<Manifest>, force: bool) -> PerFile {
        let absolute = self.workspace_root.join(&path);
        let bytes = match tokio::fs::read(&absolute).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return PerFile::Gone(path);
            }
            Err(err) => {
                return PerFile::Failed(LienError::file_not_readable(path, err.to_string()));
            }
        };

        let (content_hash, hash_algorithm) = compute_content_hash(&bytes);
        if !force {
            if let Some(entry) = snapshot.get(&path) {
                if entry.content_hash == content_hash && entry.hash_algorithm == hash_algorithm {
                    return PerFile::Unchanged(path);
                }
            }
        }

        let content = String::from_utf8_lossy(&bytes).into_owned();
        let language = Language::from_path(std::path::Path::new(&path));

        // AST parsing and complexity are pure CPU; keep them off the reactor.
        let chunker = self.chunker.clone();
        let chunk_path = path.clone();
        let chunks = match tokio::task::spawn_blocking(move || {
            chunker.chunk_file(&chunk_path, &content)
        })
        .await
        {
            Ok(Ok(chunks)) => chunks,
            Ok(Err(err)) => return PerFile::Failed(err),
            Err(join_err) => {
                return PerFile::Failed(LienError::indexing(path, format!("chunker panicked: {join_err}")));
            }
        };

        let mut chunks = chunks;
        if let Some(repo_id) = &self.repo_id {
            for chunk in &mut chunks {
                chunk.metadata_mut().repo_id = Some(repo_id.clone());
            }
        }

        // All of a file's chunks embed as one logical batch, split only by
        // the configured inference batch size.
        let texts: Vec<String> = chunks.iter().map(|c| c.content().to_string()).collect();
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.embedding_batch_size) {
            let embedded = match timeout(self.embedder.timeout(), self.embedder.embed_batch(batch))
                .await
            {
                Ok(Ok(vs)) => vs,
                Ok(Err(err)) => return PerFile::Failed(err),
                Err(_) => {
                    return PerFile::Failed(LienError::embedding(format!(
                        "embedding timed out for {path}"
                    )));
                }
            };
            vectors.extend(embedded);
        }
        if vectors.len() != chunks.len() {
            return PerFile::Failed(LienError::embedding(format!(
                "embedder returned {} vectors for {} chunks ({path})",
                vectors.len(),
                chunks.len()
            )));
        }

        let records: Vec<ChunkRecord> = vectors
            .into_iter()
            .zip(chunks)
            .map(|(vector, chunk)| ChunkRecord::new(vector, chunk))
            .collect();

        PerFile::Prepared(Box::new(PreparedFile {
            path,
            content_hash,
            hash_algorithm,
            language,
            records,
        }))
    }

    /// Walks the workspace honoring gitignore semantics; returns
    /// workspace-relative paths with forward slashes.
    pub fn scan_workspace(&self) -> Vec<String> {
        scan_indexable(&self.workspace_root)
    }
}

/// Workspace scan shared with the CLI's store-free analyses.
pub fn scan_indexable(workspace_root: &std::path::Path) -> Vec<String> {
    let mut files: Vec<String> = WalkBuilder::new(workspace_root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            name != "node_modules" && name != "vendor"
        })
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(workspace_root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .filter(|path| is_indexable(path))
        .collect();
    files.sort();
    files
}

fn is_indexable(path: &str) -> bool {
    if is_template_path(path) {
        return true;
    }
    let extension = path.rsplit('.').next().unwrap_or("");
    Language::from_extension(extension).is_known()
        || PLAIN_TEXT_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexable_paths() {
        assert!(is_indexable("src/a.ts"));
        assert!(is_indexable("lib/b.py"));
        assert!(is_indexable("README.md"));
        assert!(is_indexable("sections/hero.liquid"));
        assert!(is_indexable("config/templates/page.json"));
        assert!(!is_indexable("logo.png"));
        assert!(!is_indexable("package.json"));
    }
}
