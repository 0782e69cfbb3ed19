//! # Application Layer
//!
//! Port traits (embedder, vector store), the reindex coordinator, query
//! sessions, and the use cases orchestrating domain and connector layers.

pub mod coordinator;
pub mod interfaces;
pub mod session;
pub mod use_cases;

pub use coordinator::*;
pub use interfaces::*;
pub use session::*;
pub use use_cases::*;
