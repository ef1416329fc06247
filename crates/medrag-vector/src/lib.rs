//! Persisted vector index over chunk embeddings.
//!
//! [`VectorIndexStore`] owns chunking, embedding and ranking policy; the
//! [`IndexBackend`] it wraps only stores entries. Two backends exist:
//! [`FlatIndex`] (vector file plus JSON side-table) and [`LanceCollection`]
//! (lancedb table).

pub mod backend;
pub mod collection;
pub mod flat;
pub mod schema;
pub mod search;
pub mod store;
pub mod table;
pub mod writer;

pub use backend::{open_backend, IndexBackend};
pub use collection::LanceCollection;
pub use flat::{FlatIndex, FlatSnapshot};
pub use store::VectorIndexStore;

pub(crate) fn storage_err<E: std::fmt::Display>(e: E) -> medrag_core::Error {
    medrag_core::Error::Storage(e.to_string())
}
