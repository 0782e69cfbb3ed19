use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::version::write_atomic;
use crate::domain::LienError;

/// Snapshot of the repository head, persisted at `.lien/.git-state.json` so
/// branch switches and commits made while Lien was not running are detected
/// on the next start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitState {
    pub branch: String,
    pub commit: String,
    pub timestamp: DateTime<Utc>,
}

/// Reads git head state directly from `.git/` (no subprocess) and diffs it
/// against the persisted snapshot.
pub struct GitStateTracker {
    git_dir: PathBuf,
    state_path: PathBuf,
}

impl GitStateTracker {
    pub fn new(workspace_root: impl Into<PathBuf>, state_path: impl Into<PathBuf>) -> Self {
        let root = workspace_root.into();
        Self {
            git_dir: root.join(".git"),
            state_path: state_path.into(),
        }
    }

    /// The current head, or `None` when the workspace is not a git repo.
    pub fn current(&self) -> Option<GitState> {
        let head = std::fs::read_to_string(self.git_dir.join("HEAD")).ok()?;
        let head = head.trim();

        if let Some(reference) = head.strip_prefix("ref: ") {
            let branch = reference
                .strip_prefix("refs/heads/")
                .unwrap_or(reference)
                .to_string();
            let commit = std::fs::read_to_string(self.git_dir.join(reference))
                .map(|c| c.trim().to_string())
                .or_else(|_| self.packed_ref(reference))
                .unwrap_or_default();
            Some(GitState {
                branch,
                commit,
                timestamp: Utc::now(),
            })
        } else {
            // Detached head: HEAD holds the commit itself.
            Some(GitState {
                branch: "HEAD".to_string(),
                commit: head.to_string(),
                timestamp: Utc::now(),
            })
        }
    }

    fn packed_ref(&self, reference: &str) -> Result<String, std::io::Error> {
        let packed = std::fs::read_to_string(self.git_dir.join("packed-refs"))?;
        for line in packed.lines() {
            if let Some((commit, name)) = line.split_once(' ') {
                if name.trim() == reference {
                    return Ok(commit.trim().to_string());
                }
            }
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "ref not packed",
        ))
    }

    pub fn saved(&self) -> Option<GitState> {
        let raw = std::fs::read_to_string(&self.state_path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    pub fn save(&self, state: &GitState) -> Result<(), LienError> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| LienError::internal(format!("git state serialization: {e}")))?;
        write_atomic(&self.state_path, json.as_bytes())
    }

    /// Detects a branch or commit change since the last persisted snapshot
    /// and persists the new head. Returns the fresh state when it changed.
    pub fn detect_change(&self) -> Result<Option<GitState>, LienError> {
        let current = match self.current() {
            Some(c) => c,
            None => return Ok(None),
        };
        let changed = match self.saved() {
            Some(saved) => saved.branch != current.branch || saved.commit != current.commit,
            None => true,
        };
        if changed {
            debug!(
                "Git head moved to {}@{}",
                current.branch,
                &current.commit.get(..8).unwrap_or(&current.commit)
            );
            self.save(&current)?;
            Ok(Some(current))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fake_repo(dir: &std::path::Path, branch: &str, commit: &str) {
        let git = dir.join(".git");
        fs::create_dir_all(git.join("refs/heads")).unwrap();
        fs::write(git.join("HEAD"), format!("ref: refs/heads/{branch}\n")).unwrap();
        fs::write(git.join("refs/heads").join(branch), format!("{commit}\n")).unwrap();
    }

    #[test]
    fn test_reads_branch_and_commit() {
        let dir = tempfile::tempdir().unwrap();
        fake_repo(dir.path(), "main", "abc123");
        let tracker = GitStateTracker::new(dir.path(), dir.path().join(".git-state.json"));

        let state = tracker.current().unwrap();
        assert_eq!(state.branch, "main");
        assert_eq!(state.commit, "abc123");
    }

    #[test]
    fn test_detached_head() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "deadbeef\n").unwrap();
        let tracker = GitStateTracker::new(dir.path(), dir.path().join(".git-state.json"));

        let state = tracker.current().unwrap();
        assert_eq!(state.branch, "HEAD");
        assert_eq!(state.commit, "deadbeef");
    }

    #[test]
    fn test_detect_change_persists_and_settles() {
        let dir = tempfile::tempdir().unwrap();
        fake_repo(dir.path(), "main", "abc123");
        let tracker = GitStateTracker::new(dir.path(), dir.path().join(".git-state.json"));

        // First observation is always a change.
        assert!(tracker.detect_change().unwrap().is_some());
        // Unchanged head settles.
        assert!(tracker.detect_change().unwrap().is_none());

        // A new commit is detected once.
        fake_repo(dir.path(), "main", "def456");
        let change = tracker.detect_change().unwrap().unwrap();
        assert_eq!(change.commit, "def456");
        assert!(tracker.detect_change().unwrap().is_none());
    }

    #[test]
    fn test_non_git_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = GitStateTracker::new(dir.path(), dir.path().join(".git-state.json"));
        assert!(tracker.current().is_none());
        assert!(tracker.detect_change().unwrap().is_none());
    }
}
