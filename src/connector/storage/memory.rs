use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use super::version::VersionStamp;
use crate::application::{ChunkRecord, ScanFilter, SearchHit, SymbolQuery, VectorStore};
use crate::domain::{CodeChunk, LienError};
use crate::util::safe_regex;

/// In-memory [`VectorStore`] with a file-backed version stamp.
///
/// Backs tests and local CLI runs; a Lance/Qdrant adapter implements the
/// same contract for production deployments. Rows live behind one mutex so
/// per-file replacement is trivially atomic; the version stamp still
/// persists to disk so query sessions observe snapshot changes across
/// processes.
pub struct MemoryVectorStore {
    records: Mutex<Vec<ChunkRecord>>,
    stamp: VersionStamp,
    opened_version: AtomicU64,
    write_ops: AtomicU64,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            stamp: VersionStamp::in_memory(),
            opened_version: AtomicU64::new(0),
            write_ops: AtomicU64::new(0),
        }
    }

    /// A store whose version stamp persists at
    /// `<state_dir>/.lien-index-version`.
    pub fn with_version_file(version_path: impl AsRef<Path>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            stamp: VersionStamp::at(version_path.as_ref()),
            opened_version: AtomicU64::new(0),
            write_ops: AtomicU64::new(0),
        }
    }

    /// Number of mutation calls served (used by idempotence tests).
    pub fn write_ops(&self) -> u64 {
        self.write_ops.load(Ordering::SeqCst)
    }

    pub async fn row_count(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn rows_for_file(&self, path: &str) -> usize {
        self.records
            .lock()
            .await
            .iter()
            .filter(|r| r.chunk.metadata().file == path)
            .count()
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn initialize(&self) -> Result<(), LienError> {
        let version = self.stamp.read()?;
        self.opened_version.store(version, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert_batch(&self, records: Vec<ChunkRecord>) -> Result<(), LienError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut rows = self.records.lock().await;
        for record in records {
            let key = record.chunk.key();
            rows.retain(|existing| existing.chunk.key() != key);
            rows.push(record);
        }
        drop(rows);
        self.write_ops.fetch_add(1, Ordering::SeqCst);
        self.stamp.bump()?;
        Ok(())
    }

    async fn replace_file(&self, path: &str, records: Vec<ChunkRecord>) -> Result<(), LienError> {
        // Delete-then-insert under one lock: per-file replacement is atomic.
        let mut rows = self.records.lock().await;
        rows.retain(|r| r.chunk.metadata().file != path);
        let inserted = records.len();
        rows.extend(records);
        drop(rows);
        self.write_ops.fetch_add(1, Ordering::SeqCst);
        self.stamp.bump()?;
        debug!("Replaced {} with {} rows", path, inserted);
        Ok(())
    }

    async fn delete_by_file(&self, path: &str) -> Result<u64, LienError> {
        let mut rows = self.records.lock().await;
        let before = rows.len();
        rows.retain(|r| r.chunk.metadata().file != path);
        let removed = (before - rows.len()) as u64;
        drop(rows);
        if removed > 0 {
            self.write_ops.fetch_add(1, Ordering::SeqCst);
            self.stamp.bump()?;
        }
        Ok(removed)
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchHit>, LienError> {
        let rows = self.records.lock().await;
        let mut hits: Vec<SearchHit> = rows
            .iter()
            .map(|r| SearchHit {
                chunk: r.chunk.clone(),
                score: cosine_similarity(vector, &r.vector),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn scan_with_filter(&self, filter: &ScanFilter) -> Result<Vec<CodeChunk>, LienError> {
        filter.validate()?;
        let matcher = filter
            .pattern
            .as_deref()
            .map(safe_regex::compile_case_insensitive)
            .transpose()?;

        let rows = self.records.lock().await;
        let mut chunks: Vec<CodeChunk> = rows
            .iter()
            .filter(|r| {
                let metadata = r.chunk.metadata();
                if let Some(language) = &filter.language {
                    if metadata.language.as_str() != language {
                        return false;
                    }
                }
                if let Some(re) = &matcher {
                    if !re.is_match(&metadata.file) {
                        return false;
                    }
                }
                true
            })
            .map(|r| r.chunk.clone())
            .collect();

        chunks.sort_by(|a, b| {
            (&a.metadata().file, a.metadata().start_line)
                .cmp(&(&b.metadata().file, b.metadata().start_line))
        });
        if let Some(limit) = filter.limit {
            chunks.truncate(limit);
        }
        Ok(chunks)
    }

    async fn query_symbols(&self, query: &SymbolQuery) -> Result<Vec<CodeChunk>, LienError> {
        let rows = self.records.lock().await;
        let mut chunks: Vec<CodeChunk> = rows
            .iter()
            .filter(|r| {
                let metadata = r.chunk.metadata();
                if !query.matches_symbol_type(&metadata.symbol_type) {
                    return false;
                }
                if let Some(name) = &query.name {
                    if &metadata.symbol_name != name {
                        return false;
                    }
                }
                true
            })
            .map(|r| r.chunk.clone())
            .collect();
        chunks.sort_by(|a, b| {
            (&a.metadata().file, a.metadata().start_line)
                .cmp(&(&b.metadata().file, b.metadata().start_line))
        });
        if let Some(limit) = query.limit {
            chunks.truncate(limit);
        }
        Ok(chunks)
    }

    async fn has_data(&self) -> Result<bool, LienError> {
        Ok(!self.records.lock().await.is_empty())
    }

    async fn current_version(&self) -> Result<u64, LienError> {
        self.stamp.read()
    }

    async fn version_date(&self) -> Result<Option<DateTime<Utc>>, LienError> {
        self.stamp.date()
    }

    async fn reconnect(&self) -> Result<(), LienError> {
        let version = self.stamp.read()?;
        self.opened_version.store(version, Ordering::SeqCst);
        debug!("Reconnected store view at version {}", version);
        Ok(())
    }
}

/// Cosine similarity in one pass over both vectors. Mismatched dimensions
/// and zero-magnitude vectors score 0.0 rather than erroring, so a record
/// written by an older embedder config simply ranks last.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (dot, a_sq, b_sq) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, a_sq, b_sq), (x, y)| {
            (dot + x * y, a_sq + x * x, b_sq + y * y)
        });
    let denominator = (a_sq * b_sq).sqrt();
    if denominator <= f32::EPSILON {
        return 0.0;
    }
    dot / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChunkKind, ChunkMetadata, Language};

    fn record(file: &str, start: u32, name: &str, symbol_type: &str, vector: Vec<f32>) -> ChunkRecord {
        let mut metadata =
            ChunkMetadata::new(file, start, start + 3, ChunkKind::Function, Language::TypeScript);
        metadata.symbol_name = name.to_string();
        metadata.symbol_type = symbol_type.to_string();
        ChunkRecord::new(vector, CodeChunk::new("fn body", metadata))
    }

    #[tokio::test]
    async fn test_replace_file_swaps_rows_and_bumps_version() {
        let store = MemoryVectorStore::new();
        store.initialize().await.unwrap();

        store
            .replace_file(
                "a.ts",
                vec![record("a.ts", 1, "old", "function", vec![1.0, 0.0])],
            )
            .await
            .unwrap();
        let v1 = store.current_version().await.unwrap();

        store
            .replace_file(
                "a.ts",
                vec![
                    record("a.ts", 1, "new_one", "function", vec![1.0, 0.0]),
                    record("a.ts", 10, "new_two", "function", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();
        let v2 = store.current_version().await.unwrap();

        assert_eq!(store.rows_for_file("a.ts").await, 2);
        assert!(v2 > v1);
        let symbols = store.query_symbols(&SymbolQuery::default()).await.unwrap();
        assert!(symbols.iter().all(|c| c.metadata().symbol_name != "old"));
    }

    #[tokio::test]
    async fn test_delete_by_file_removes_all_rows() {
        let store = MemoryVectorStore::new();
        store
            .upsert_batch(vec![
                record("a.ts", 1, "f", "function", vec![1.0]),
                record("b.ts", 1, "g", "function", vec![1.0]),
            ])
            .await
            .unwrap();

        let removed = store.delete_by_file("a.ts").await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.rows_for_file("a.ts").await, 0);
        assert_eq!(store.rows_for_file("b.ts").await, 1);

        // Deleting an absent file is a no-op and does not bump the version.
        let before = store.current_version().await.unwrap();
        assert_eq!(store.delete_by_file("a.ts").await.unwrap(), 0);
        assert_eq!(store.current_version().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_search_ranks_by_cosine() {
        let store = MemoryVectorStore::new();
        store
            .upsert_batch(vec![
                record("a.ts", 1, "close", "function", vec![1.0, 0.0]),
                record("b.ts", 1, "far", "function", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.1], 2).await.unwrap();
        assert_eq!(hits[0].chunk.metadata().symbol_name, "close");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_scan_filters_language_and_pattern() {
        let store = MemoryVectorStore::new();
        let mut py = record("lib/worker.py", 1, "work", "function", vec![1.0]);
        py.chunk.metadata_mut().language = Language::Python;
        store
            .upsert_batch(vec![record("src/api.ts", 1, "api", "function", vec![1.0]), py])
            .await
            .unwrap();

        let by_language = store
            .scan_with_filter(&ScanFilter {
                language: Some("python".to_string()),
                ..ScanFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(by_language.len(), 1);
        assert_eq!(by_language[0].metadata().file, "lib/worker.py");

        let by_pattern = store
            .scan_with_filter(&ScanFilter {
                pattern: Some("SRC/.*".to_string()),
                ..ScanFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(by_pattern.len(), 1);
        assert_eq!(by_pattern[0].metadata().file, "src/api.ts");

        let rejected = store
            .scan_with_filter(&ScanFilter {
                pattern: Some("(x+)+".to_string()),
                ..ScanFilter::default()
            })
            .await;
        assert!(rejected.is_err());
    }

    #[tokio::test]
    async fn test_symbol_query_function_matches_methods() {
        let store = MemoryVectorStore::new();
        store
            .upsert_batch(vec![
                record("a.ts", 1, "run", "function", vec![1.0]),
                record("a.ts", 10, "start", "method", vec![1.0]),
                record("a.ts", 20, "Service", "class", vec![1.0]),
            ])
            .await
            .unwrap();

        let hits = store
            .query_symbols(&SymbolQuery {
                symbol_type: Some("function".to_string()),
                ..SymbolQuery::default()
            })
            .await
            .unwrap();
        let names: Vec<&str> = hits.iter().map(|c| c.metadata().symbol_name.as_str()).collect();
        assert_eq!(names, vec!["run", "start"]);
    }

    #[tokio::test]
    async fn test_version_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let version_path = dir.path().join(".lien-index-version");

        let store = MemoryVectorStore::with_version_file(&version_path);
        store
            .upsert_batch(vec![record("a.ts", 1, "f", "function", vec![1.0])])
            .await
            .unwrap();
        let version = store.current_version().await.unwrap();
        assert!(version > 0);

        let reopened = MemoryVectorStore::with_version_file(&version_path);
        assert_eq!(reopened.current_version().await.unwrap(), version);
        assert!(reopened.version_date().await.unwrap().is_some());
    }
}
