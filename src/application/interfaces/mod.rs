mod embedder;
mod vector_store;

pub use embedder::*;
pub use vector_store::*;
