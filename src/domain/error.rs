use thiserror::Error;

/// Crate-wide error type.
///
/// Every variant maps to a stable machine-readable [`code`](LienError::code)
/// so callers (CLI, tool handlers) can classify failures without string
/// matching, and carries `retryable`/`recoverable` semantics:
///
/// - *retryable*: the same call may succeed later (embedder hiccup,
///   transient store I/O).
/// - *recoverable*: the failure is scoped to a single file; the surrounding
///   batch continues and the error is reported in the outcome.
#[derive(Debug, Error)]
pub enum LienError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Indexing error for {path}: {message}")]
    Indexing { path: String, message: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Database error: {0}")]
    Database(String),

    /// The store reported corruption. Fatal; the caller must trigger a full
    /// rebuild rather than retry.
    #[error("Database corruption: {0}")]
    Corruption(String),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("File not readable: {path}: {message}")]
    FileNotReadable { path: String, message: String },

    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LienError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn indexing(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Indexing {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn file_not_readable(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::FileNotReadable {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::Indexing { .. } => "indexing_error",
            Self::Embedding(_) => "embedding_error",
            Self::Database(_) => "database_error",
            Self::Corruption(_) => "database_corruption",
            Self::FileNotFound { .. } => "file_not_found",
            Self::FileNotReadable { .. } => "file_not_readable",
            Self::InvalidPath { .. } => "invalid_path",
            Self::InvalidInput(_) => "invalid_input",
            Self::Io(_) => "io_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Embedding(_) | Self::Database(_))
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Indexing { .. }
                | Self::FileNotFound { .. }
                | Self::FileNotReadable { .. }
                | Self::InvalidPath { .. }
        )
    }

    /// The path this error is scoped to, when it is a per-file error.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Indexing { path, .. }
            | Self::FileNotFound { path }
            | Self::FileNotReadable { path, .. }
            | Self::InvalidPath { path } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(LienError::config("bad key").code(), "config_error");
        assert_eq!(
            LienError::indexing("a.ts", "parse failed").code(),
            "indexing_error"
        );
        assert_eq!(LienError::embedding("timeout").code(), "embedding_error");
        assert_eq!(
            LienError::corruption("bad page").code(),
            "database_corruption"
        );
    }

    #[test]
    fn test_retryable_and_recoverable_classification() {
        assert!(LienError::embedding("timeout").is_retryable());
        assert!(LienError::database("locked").is_retryable());
        assert!(!LienError::corruption("torn write").is_retryable());
        assert!(!LienError::config("nope").is_retryable());

        assert!(LienError::indexing("a.ts", "boom").is_recoverable());
        assert!(LienError::file_not_found("gone.ts").is_recoverable());
        assert!(!LienError::database("locked").is_recoverable());
    }

    #[test]
    fn test_per_file_errors_carry_path() {
        assert_eq!(
            LienError::indexing("src/a.ts", "boom").path(),
            Some("src/a.ts")
        );
        assert_eq!(LienError::invalid_input("empty query").path(), None);
    }
}
