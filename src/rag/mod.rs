//! Retrieval pipeline: persisted vector index, top-k/threshold retrieval
//! and context assembly for the recommendation prompt.

pub mod context;
pub mod retriever;
pub mod store;

pub use context::ContextFormatter;
pub use retriever::Retriever;
pub use store::{SearchResult, VectorStore};
