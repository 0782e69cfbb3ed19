use std::path::{Path, PathBuf};

/// On-disk layout of Lien's persisted state under the workspace root.
#[derive(Debug, Clone)]
pub struct StateLayout {
    workspace_root: PathBuf,
}

impl StateLayout {
    pub const STATE_DIR: &'static str = ".lien";

    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn state_dir(&self) -> PathBuf {
        self.workspace_root.join(Self::STATE_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.state_dir().join("manifest.json")
    }

    pub fn version_path(&self) -> PathBuf {
        self.state_dir().join(".lien-index-version")
    }

    pub fn git_state_path(&self) -> PathBuf {
        self.state_dir().join(".git-state.json")
    }

    pub fn indices_dir(&self) -> PathBuf {
        self.state_dir().join("indices")
    }

    pub fn config_path(&self) -> PathBuf {
        self.workspace_root.join(".lien.config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = StateLayout::new("/work/repo");
        assert_eq!(layout.state_dir(), PathBuf::from("/work/repo/.lien"));
        assert_eq!(
            layout.manifest_path(),
            PathBuf::from("/work/repo/.lien/manifest.json")
        );
        assert_eq!(
            layout.version_path(),
            PathBuf::from("/work/repo/.lien/.lien-index-version")
        );
        assert_eq!(
            layout.config_path(),
            PathBuf::from("/work/repo/.lien.config.json")
        );
    }
}
