use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;

use medrag_core::config::{expand_path, BackendKind, IndexSettings};
use medrag_core::error::Result;
use medrag_core::types::{ChunkId, IndexEntry, SearchResult};

use crate::collection::LanceCollection;
use crate::flat::FlatIndex;

/// Persistence strategy behind [`crate::VectorIndexStore`].
///
/// Embeddings handed to a backend are already L2-normalized. Results are
/// ranked by descending inner product with ties broken by ascending chunk id.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Directory the index lives in.
    fn location(&self) -> &Path;

    async fn exists(&self) -> Result<bool>;

    /// Remove the persisted index. A missing index is not an error.
    async fn destroy(&self) -> Result<()>;

    /// Ids of every persisted entry; empty when no index exists.
    async fn chunk_ids(&self) -> Result<HashSet<ChunkId>>;

    /// Persist `entries` whose ids are not yet present, all or nothing.
    /// Creates the index on first use. Returns the number of entries added.
    async fn append(&self, entries: Vec<IndexEntry>) -> Result<usize>;

    async fn count(&self) -> Result<usize>;

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;
}

/// Open the backend selected by `settings.backend` at `settings.dir`.
pub fn open_backend(settings: &IndexSettings, model_id: &str) -> Box<dyn IndexBackend> {
    let dir = expand_path(&settings.dir);
    match settings.backend {
        BackendKind::Flat => Box::new(FlatIndex::new(dir, model_id)),
        BackendKind::Collection => Box::new(LanceCollection::new(dir, &settings.table)),
    }
}
