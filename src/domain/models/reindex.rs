use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Process-wide reindex lifecycle snapshot.
///
/// `in_progress` means "some operation is active", never "a specific
/// operation is active": multiple operations (a watch batch, a git-poll
/// catch-up) may run concurrently and `pending_files` is the union of all of
/// their file sets. `last_duration_ms` reflects the most recent completion,
/// not cumulative wall time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReindexState {
    pub in_progress: bool,
    pub pending_files: BTreeSet<String>,
    pub last_reindex_millis: Option<u64>,
    pub last_duration_ms: Option<u64>,
    pub active_operations: usize,
}

impl ReindexState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        !self.in_progress && self.active_operations == 0 && self.pending_files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_state() {
        let state = ReindexState::idle();
        assert!(state.is_idle());
        assert_eq!(state.active_operations, 0);
        assert!(state.pending_files.is_empty());
    }
}
