use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::application::{ComplexityThresholds, SeverityMultipliers};
use crate::connector::parsing::{AstFallback, ChunkerConfig};
use crate::domain::LienError;

/// `.lien.config.json`. Every key is optional; unknown keys are rejected so
/// typos surface instead of silently falling back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LienConfig {
    pub core: CoreConfig,
    pub chunking: ChunkingConfig,
    pub git_detection: GitDetectionConfig,
    pub file_watching: FileWatchingConfig,
    pub complexity: ComplexityConfig,
    /// Per-subtree overrides; an empty list lets the detectors decide.
    pub frameworks: Vec<FrameworkConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CoreConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub concurrency: usize,
    pub embedding_batch_size: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            chunk_size: 75,
            chunk_overlap: 10,
            concurrency: 4,
            embedding_batch_size: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AstFallbackMode {
    #[serde(rename = "line-based")]
    LineBased,
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ChunkingConfig {
    pub use_ast: bool,
    pub ast_fallback: AstFallbackMode,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            use_ast: true,
            ast_fallback: AstFallbackMode::LineBased,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct GitDetectionConfig {
    pub enabled: bool,
    pub poll_interval_ms: u64,
}

impl Default for GitDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct FileWatchingConfig {
    pub enabled: bool,
    pub debounce_ms: u64,
}

impl Default for FileWatchingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ComplexityConfig {
    pub thresholds: ComplexityThresholds,
    pub severity: SeverityMultipliers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FrameworkConfig {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl LienConfig {
    /// Loads and validates the config file. A missing file yields defaults;
    /// malformed JSON or unknown keys are a `ConfigError`.
    pub fn load(path: &Path) -> Result<Self, LienError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LienError::config(format!("cannot read {}: {e}", path.display())))?;
        let config: LienConfig = serde_json::from_str(&raw)
            .map_err(|e| LienError::config(format!("malformed {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LienError> {
        if self.core.chunk_size == 0 {
            return Err(LienError::config("core.chunkSize must be at least 1"));
        }
        if self.core.chunk_overlap >= self.core.chunk_size {
            return Err(LienError::config(
                "core.chunkOverlap must be smaller than core.chunkSize",
            ));
        }
        if self.core.concurrency == 0 {
            return Err(LienError::config("core.concurrency must be at least 1"));
        }
        if self.core.embedding_batch_size == 0 {
            return Err(LienError::config("core.embeddingBatchSize must be at least 1"));
        }
        self.complexity.thresholds.validate()?;
        let severity = &self.complexity.severity;
        if severity.warning <= 0.0 || severity.error <= 0.0 {
            return Err(LienError::config("complexity.severity multipliers must be positive"));
        }
        if severity.error < severity.warning {
            return Err(LienError::config(
                "complexity.severity.error must be at least the warning multiplier",
            ));
        }
        Ok(())
    }

    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            chunk_size: self.core.chunk_size,
            chunk_overlap: self.core.chunk_overlap,
            use_ast: self.chunking.use_ast,
            fallback: match self.chunking.ast_fallback {
                AstFallbackMode::LineBased => AstFallback::LineBased,
                AstFallbackMode::Error => AstFallback::Error,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LienConfig::default();
        assert_eq!(config.core.chunk_size, 75);
        assert_eq!(config.core.chunk_overlap, 10);
        assert_eq!(config.core.concurrency, 4);
        assert_eq!(config.core.embedding_batch_size, 50);
        assert!(config.chunking.use_ast);
        assert_eq!(config.chunking.ast_fallback, AstFallbackMode::LineBased);
        assert!(config.file_watching.enabled);
        assert_eq!(config.file_watching.debounce_ms, 1_000);
        assert_eq!(config.git_detection.poll_interval_ms, 10_000);
        assert!(config.frameworks.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_parses() {
        let config: LienConfig =
            serde_json::from_str(r#"{"core": {"chunkSize": 100}, "chunking": {"astFallback": "error"}}"#)
                .unwrap();
        assert_eq!(config.core.chunk_size, 100);
        // Unspecified keys keep their defaults.
        assert_eq!(config.core.chunk_overlap, 10);
        assert_eq!(config.chunking.ast_fallback, AstFallbackMode::Error);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result: Result<LienConfig, _> = serde_json::from_str(r#"{"coer": {}}"#);
        assert!(result.is_err());
        let nested: Result<LienConfig, _> =
            serde_json::from_str(r#"{"core": {"chunkSizes": 3}}"#);
        assert!(nested.is_err());
    }

    #[test]
    fn test_invalid_thresholds_fail_validation() {
        let config: LienConfig =
            serde_json::from_str(r#"{"complexity": {"thresholds": {"method": -1}}}"#).unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "config_error");
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let config: LienConfig =
            serde_json::from_str(r#"{"core": {"chunkSize": 10, "chunkOverlap": 10}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LienConfig::load(&dir.path().join(".lien.config.json")).unwrap();
        assert_eq!(config.core.chunk_size, 75);
    }

    #[test]
    fn test_frameworks_section() {
        let config: LienConfig = serde_json::from_str(
            r#"{"frameworks": [{"name": "shopify", "path": "theme", "include": ["**/*.liquid"]}]}"#,
        )
        .unwrap();
        assert_eq!(config.frameworks.len(), 1);
        assert_eq!(config.frameworks[0].name, "shopify");
        assert!(config.frameworks[0].exclude.is_empty());
    }
}
