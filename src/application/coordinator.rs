use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::domain::ReindexState;

/// Owns the process-wide reindex lifecycle.
///
/// Multiple operations may run concurrently (a watch batch and a git-poll
/// catch-up, for instance); `pending_files` is the union of their file sets
/// and `active_operations` counts them. State clears only when the counter
/// returns to zero.
pub struct ReindexCoordinator {
    state: Mutex<ReindexState>,
}

impl ReindexCoordinator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReindexState::idle()),
        }
    }

    /// Begins an operation over `files`. An empty set is silently ignored
    /// and tracks no operation; callers rely on this across call sites.
    /// Returns whether an operation was actually started.
    pub fn start_reindex<I>(&self, files: I) -> bool
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let files: Vec<String> = files.into_iter().map(Into::into).collect();
        if files.is_empty() {
            return false;
        }
        let mut state = self.state.lock().expect("coordinator lock poisoned");
        state.active_operations += 1;
        state.pending_files.extend(files);
        state.in_progress = true;
        debug!(
            "Reindex started ({} active, {} pending files)",
            state.active_operations,
            state.pending_files.len()
        );
        true
    }

    /// Completes one operation. When the last active operation finishes the
    /// pending set clears and timing is recorded; `last_duration_ms` always
    /// reflects the most recent completion, not cumulative wall time.
    pub fn complete_reindex(&self, duration_ms: u64) {
        let mut state = self.state.lock().expect("coordinator lock poisoned");
        if state.active_operations == 0 {
            warn!("complete_reindex without a matching start; ignoring");
            return;
        }
        state.active_operations -= 1;
        if state.active_operations == 0 {
            state.pending_files.clear();
            state.in_progress = false;
            state.last_reindex_millis = Some(now_millis());
            state.last_duration_ms = Some(duration_ms);
        }
    }

    /// Fails one operation: same decrement, but no timing is recorded.
    pub fn fail_reindex(&self) {
        let mut state = self.state.lock().expect("coordinator lock poisoned");
        if state.active_operations == 0 {
            warn!("fail_reindex without a matching start; ignoring");
            return;
        }
        state.active_operations -= 1;
        if state.active_operations == 0 {
            state.pending_files.clear();
            state.in_progress = false;
        }
    }

    /// Immutable snapshot for observers.
    pub fn snapshot(&self) -> ReindexState {
        self.state.lock().expect("coordinator lock poisoned").clone()
    }

    /// Guard-based start: the returned guard fails the operation on drop
    /// unless it is explicitly completed, so a cancelled reindex future
    /// never leaks an active-operation count. `None` when `files` is empty
    /// (no operation tracked).
    pub fn begin<I>(&self, files: I) -> Option<ReindexGuard<'_>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        if !self.start_reindex(files) {
            return None;
        }
        Some(ReindexGuard {
            coordinator: self,
            settled: false,
        })
    }
}

/// Settles one tracked reindex operation exactly once. Dropping the guard
/// without completing counts as a failure (cancellation safety).
pub struct ReindexGuard<'a> {
    coordinator: &'a ReindexCoordinator,
    settled: bool,
}

impl ReindexGuard<'_> {
    pub fn complete(mut self, duration_ms: u64) {
        self.settled = true;
        self.coordinator.complete_reindex(duration_ms);
    }

    pub fn fail(mut self) {
        self.settled = true;
        self.coordinator.fail_reindex();
    }
}

impl Drop for ReindexGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.fail_reindex();
        }
    }
}

impl Default for ReindexCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
