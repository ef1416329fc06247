pub mod chunker;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;

pub use chunker::{chunk_corpus, chunks, ChunkingConfig, Chunks};
pub use error::{Error, Result};
pub use traits::Embedder;
pub use types::{Answer, Chunk, ChunkId, Document, IndexEntry, SearchResult};
