//! # Connector Layer
//!
//! External integrations: tree-sitter parsing, storage adapters, the mock
//! embedder, and the filesystem watcher.

pub mod embedding;
pub mod parsing;
pub mod storage;
pub mod watch;

pub use embedding::*;
pub use parsing::{is_template_path, AstFallback, Chunker, ChunkerConfig};
pub use storage::*;
pub use watch::FileWatcher;
