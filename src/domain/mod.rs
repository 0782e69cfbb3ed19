//! # Domain Layer
//!
//! Core models (chunks, manifest entries, complexity metrics, graph types,
//! reindex state) and the crate error type. This layer is independent of
//! external frameworks and infrastructure.

pub mod error;
pub mod models;

pub use error::*;
pub use models::*;
