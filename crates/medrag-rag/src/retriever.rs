use medrag_core::error::{Error, Result};
use medrag_core::traits::normalize;
use medrag_core::types::SearchResult;
use medrag_vector::VectorIndexStore;
use tracing::debug;

/// Turns a question into the top-k most similar indexed chunks.
pub struct Retriever<'a> {
    store: &'a VectorIndexStore,
}

impl<'a> Retriever<'a> {
    pub fn new(store: &'a VectorIndexStore) -> Self {
        Self { store }
    }

    /// Embed `question` with the store's embedder and return up to `k`
    /// results, best first. Fewer come back when the index holds fewer than
    /// `k` entries; the backend clamps in the same pass that scores them.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }
        let mut query = self
            .store
            .embedder()
            .embed_batch(&[question.to_string()])
            .map_err(Error::Embedding)?
            .pop()
            .ok_or_else(|| Error::Embedding(anyhow::anyhow!("embedder returned no vector for the question")))?;
        normalize(&mut query);

        let results = self.store.search(&query, k).await?;
        debug!(k, hits = results.len(), "retrieved chunks");
        Ok(results)
    }
}
