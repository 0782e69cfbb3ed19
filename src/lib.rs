//! # Lien
//!
//! A local code-intelligence engine: it turns a source tree into a
//! queryable semantic index through AST-driven chunking, a content-hash
//! manifest for incremental reindexing, and a vector-store abstraction, and
//! layers reverse-dependency and complexity analyses on top.
//!
//! ## Architecture
//!
//! The crate is organized following Domain-Driven Design principles:
//!
//! - `domain`: Core models (chunks, manifest, metrics, graph) and errors
//! - `application`: Port traits, the reindex coordinator, and use cases
//! - `connector`: External integrations (tree-sitter, storage, watcher)
//! - `util`: Path matching, gitignore semantics, safe regex
//! - `config`: `.lien.config.json` loading and validation

pub mod application;
pub mod cli;
pub mod config;
pub mod connector;
pub mod domain;
pub mod util;

// Re-export commonly used types
pub use application::*;
pub use config::LienConfig;
pub use connector::*;
pub use domain::*;
