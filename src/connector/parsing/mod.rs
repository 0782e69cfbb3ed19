//! AST-driven chunking: the language registry, the traverser, the metadata
//! extractors, and the complexity engine.

mod calls;
mod chunker;
mod complexity;
mod exports;
mod imports;
pub mod registry;
mod symbols;
mod traverser;

pub use chunker::{is_template_path, AstFallback, Chunker, ChunkerConfig};
pub use complexity::compute_metrics;
pub use imports::FileImports;
pub use registry::{grammar_for, spec_for, LanguageSpec};
