use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::debug;

use crate::domain::LienError;

/// Patterns excluded from indexing regardless of `.gitignore` content.
pub const ALWAYS_IGNORED: &[&str] = &["node_modules/**", "vendor/**", ".git/**", ".lien/**"];

/// Combined ignore filter: the workspace `.gitignore` plus the always-ignored
/// patterns. Built lazily and rebuilt when a `.gitignore` mutation is seen;
/// concurrent rebuilds are idempotent (last writer wins).
pub struct GitignoreFilter {
    matcher: Gitignore,
}

impl GitignoreFilter {
    pub fn build(workspace_root: &Path) -> Result<Self, LienError> {
        let mut builder = GitignoreBuilder::new(workspace_root);

        let gitignore = workspace_root.join(".gitignore");
        if gitignore.is_file() {
            // `add` returns a non-fatal parse error; bad lines are skipped.
            if let Some(err) = builder.add(&gitignore) {
                debug!("Ignoring malformed .gitignore line(s): {}", err);
            }
        }
        for pattern in ALWAYS_IGNORED {
            builder
                .add_line(None, pattern)
                .map_err(|e| LienError::internal(format!("bad builtin ignore pattern: {e}")))?;
        }

        let matcher = builder
            .build()
            .map_err(|e| LienError::internal(format!("gitignore build failed: {e}")))?;
        Ok(Self { matcher })
    }

    /// True when the workspace-relative path is excluded from indexing.
    pub fn is_ignored(&self, relative_path: &str) -> bool {
        let normalized = relative_path.replace('\\', "/");
        self.matcher
            .matched_path_or_any_parents(Path::new(&normalized), false)
            .is_ignore()
    }
}

/// True when a changed path is a `.gitignore` file (any directory level,
/// Windows separators included); such a change invalidates the cached
/// filter.
pub fn is_gitignore_path(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    normalized == ".gitignore" || normalized.ends_with("/.gitignore")
}
