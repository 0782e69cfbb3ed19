use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CodeChunk, LienError};
use crate::util::safe_regex;

/// One stored row: the embedding vector plus the chunk (content + metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub vector: Vec<f32>,
    pub chunk: CodeChunk,
}

impl ChunkRecord {
    pub fn new(vector: Vec<f32>, chunk: CodeChunk) -> Self {
        Self { vector, chunk }
    }
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: CodeChunk,
    pub score: f32,
}

/// Scroll-style enumeration filter.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    /// Canonical language id (`typescript`, `python`, ...).
    pub language: Option<String>,
    /// Case-insensitive regex matched against the file path. Validated
    /// against catastrophic-backtracking shapes before compiling.
    pub pattern: Option<String>,
    pub limit: Option<usize>,
}

impl ScanFilter {
    /// Rejects dangerous regex patterns up front so no store implementation
    /// ever compiles them.
    pub fn validate(&self) -> Result<(), LienError> {
        if let Some(pattern) = &self.pattern {
            safe_regex::validate_pattern(pattern)?;
        }
        Ok(())
    }
}

/// Symbol lookup query.
#[derive(Debug, Clone, Default)]
pub struct SymbolQuery {
    pub name: Option<String>,
    /// Backwards-compat rule: `function` matches both `function` and
    /// `method` records.
    pub symbol_type: Option<String>,
    pub limit: Option<usize>,
}

impl SymbolQuery {
    pub fn matches_symbol_type(&self, record_type: &str) -> bool {
        match self.symbol_type.as_deref() {
            None => true,
            Some("function") => record_type == "function" || record_type == "method",
            Some(wanted) => record_type == wanted,
        }
    }
}

/// Abstract vector database the core writes to.
///
/// The store persists vectors, metadata, content, and its own version file.
/// Per-file writes are atomic: [`replace_file`](VectorStore::replace_file)
/// either lands completely (old rows gone, new rows present, version bumped)
/// or leaves the previous rows intact and surfaces a fatal error that aborts
/// the surrounding transaction.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Opens or creates the backing store.
    async fn initialize(&self) -> Result<(), LienError>;

    /// Appends chunks. The per-chunk key is
    /// `(repo_id, file, start_line, end_line)`.
    async fn upsert_batch(&self, records: Vec<ChunkRecord>) -> Result<(), LienError>;

    /// Atomically deletes all rows with `file = path`, inserts the new
    /// batch, and bumps the version stamp.
    async fn replace_file(&self, path: &str, records: Vec<ChunkRecord>) -> Result<(), LienError>;

    /// Removes all rows with `file = path`; returns the count removed.
    async fn delete_by_file(&self, path: &str) -> Result<u64, LienError>;

    /// Distance-ranked nearest chunks with full metadata.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchHit>, LienError>;

    /// Scroll enumeration honoring the filter. Results are ordered by
    /// `(file, start_line)` and truncated at `limit`.
    async fn scan_with_filter(&self, filter: &ScanFilter) -> Result<Vec<CodeChunk>, LienError>;

    async fn query_symbols(&self, query: &SymbolQuery) -> Result<Vec<CodeChunk>, LienError>;

    async fn has_data(&self) -> Result<bool, LienError>;

    /// Millisecond version stamp of the current snapshot.
    async fn current_version(&self) -> Result<u64, LienError>;

    async fn version_date(&self) -> Result<Option<DateTime<Utc>>, LienError>;

    /// Reopens the store view on the latest snapshot. Readers that cached an
    /// older version must call this before returning results.
    async fn reconnect(&self) -> Result<(), LienError>;
}
