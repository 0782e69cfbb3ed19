use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::index_workspace::{IndexOutcome, IndexWorkspaceUseCase};
use crate::application::QuerySession;
use crate::domain::LienError;
use crate::util::gitignore::{is_gitignore_path, GitignoreFilter};

/// Pre-aggregated file change events. Debouncing and batching of raw
/// filesystem events happen in the watcher; the handler assumes batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChangeEvent {
    Changed(String),
    Added(String),
    /// Always processed, even when the path is gitignored.
    Unlinked(String),
    Batch {
        added: Vec<String>,
        modified: Vec<String>,
        deleted: Vec<String>,
    },
}

/// Applies watcher batches to the index.
///
/// The gitignore filter is cached between events and invalidated whenever a
/// `.gitignore` file changes; deletions bypass the filter entirely so the
/// store can purge previously-indexed content that has since been ignored.
pub struct ChangeHandler {
    workspace_root: PathBuf,
    indexer: Arc<IndexWorkspaceUseCase>,
    session: Arc<QuerySession>,
    filter: Mutex<Option<Arc<GitignoreFilter>>>,
}

impl ChangeHandler {
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        indexer: Arc<IndexWorkspaceUseCase>,
        session: Arc<QuerySession>,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            indexer,
            session,
            filter: Mutex::new(None),
        }
    }

    /// Processes one event. Returns `None` when the batch was skipped
    /// entirely (all paths gitignored), otherwise the reconciliation
    /// outcome.
    pub async fn handle(&self, event: FileChangeEvent) -> Result<Option<IndexOutcome>, LienError> {
        let (changed, deleted) = match event {
            FileChangeEvent::Changed(path) | FileChangeEvent::Added(path) => (vec![path], vec![]),
            FileChangeEvent::Unlinked(path) => (vec![], vec![path]),
            FileChangeEvent::Batch {
                added,
                mut modified,
                deleted,
            } => {
                let mut changed = added;
                changed.append(&mut modified);
                (changed, deleted)
            }
        };

        // A .gitignore mutation anywhere invalidates the cached filter
        // before this batch is filtered.
        if changed.iter().chain(deleted.iter()).any(|p| is_gitignore_path(p)) {
            debug!("Gitignore changed, invalidating cached filter");
            self.invalidate_filter();
        }

        let filter = self.current_filter()?;
        let surviving: Vec<String> = changed
            .into_iter()
            .filter(|path| {
                let keep = !filter.is_ignored(path);
                if !keep {
                    debug!("Dropping gitignored path {}", path);
                }
                keep
            })
            .collect();

        // Deletions are never filtered.
        if surviving.is_empty() && deleted.is_empty() {
            debug!("Batch fully gitignored; skipping");
            return Ok(None);
        }

        // Reopen the store view on the latest snapshot before writing.
        self.session.check_and_reconnect().await?;

        let outcome = self.indexer.index_files(surviving, deleted).await?;
        if outcome.did_work() {
            info!(
                "Change batch applied: {} indexed, {} deleted",
                outcome.indexed_files, outcome.deleted_files
            );
        }
        Ok(Some(outcome))
    }

    fn invalidate_filter(&self) {
        *self.filter.lock().expect("filter lock poisoned") = None;
    }

    fn current_filter(&self) -> Result<Arc<GitignoreFilter>, LienError> {
        let mut guard = self.filter.lock().expect("filter lock poisoned");
        if let Some(filter) = guard.as_ref() {
            return Ok(filter.clone());
        }
        let built = Arc::new(GitignoreFilter::build(&self.workspace_root)?);
        *guard = Some(built.clone());
        Ok(built)
    }
}
