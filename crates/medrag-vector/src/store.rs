use std::collections::HashSet;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use medrag_core::chunker::{chunk_corpus, ChunkingConfig};
use medrag_core::config::Settings;
use medrag_core::error::{Error, Result};
use medrag_core::traits::{normalize, Embedder};
use medrag_core::types::{Chunk, Document, IndexEntry, SearchResult};

use crate::backend::{open_backend, IndexBackend};

pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Chunk, embed and persist a corpus; answer nearest-neighbor queries.
///
/// Writers (`rebuild`, `update`) must not run concurrently against the same
/// index. Queries only read and may run alongside each other.
pub struct VectorIndexStore {
    backend: Box<dyn IndexBackend>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl VectorIndexStore {
    pub fn new(backend: Box<dyn IndexBackend>, embedder: Arc<dyn Embedder>) -> Self {
        Self { backend, embedder, batch_size: DEFAULT_BATCH_SIZE }
    }

    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>) -> Self {
        let backend = open_backend(&settings.index, embedder.model_id());
        Self::new(backend, embedder).with_batch_size(settings.index.batch_size)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn backend(&self) -> &dyn IndexBackend {
        self.backend.as_ref()
    }

    /// Replace the index with one built from `documents`.
    ///
    /// Fails with [`Error::EmptyCorpus`] before anything on disk is touched
    /// when the documents produce no chunks.
    pub async fn rebuild(&self, documents: &[Document], config: ChunkingConfig) -> Result<usize> {
        let chunks = dedup(chunk_corpus(documents, config));
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let entries = self.embed_chunks(chunks)?;
        self.backend.destroy().await?;
        let written = self.backend.append(entries).await?;
        info!(entries = written, backend = ?self.backend.kind(), dir = %self.backend.location().display(), "rebuilt index");
        Ok(written)
    }

    /// Embed and append chunks whose ids are not yet indexed.
    pub async fn update(&self, documents: &[Document], config: ChunkingConfig) -> Result<usize> {
        let existing = self.backend.chunk_ids().await?;
        let candidates = dedup(chunk_corpus(documents, config));
        let total = candidates.len();
        let fresh: Vec<Chunk> = candidates.into_iter().filter(|c| !existing.contains(&c.chunk_id())).collect();
        if fresh.is_empty() {
            info!(candidates = total, "index already up to date");
            return Ok(0);
        }
        let entries = self.embed_chunks(fresh)?;
        let added = self.backend.append(entries).await?;
        info!(
            added,
            skipped = total - added,
            backend = ?self.backend.kind(),
            dir = %self.backend.location().display(),
            "updated index"
        );
        Ok(added)
    }

    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }
        self.backend.search(query, k).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.backend.count().await
    }

    fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<IndexEntry>> {
        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let dim = self.embedder.dim();
        let mut entries = Vec::with_capacity(chunks.len());
        let mut pending = chunks.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<Chunk> = pending.by_ref().take(self.batch_size).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).map_err(Error::Embedding)?;
            if vectors.len() != batch.len() {
                return Err(Error::Embedding(anyhow::anyhow!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            for (chunk, mut vector) in batch.into_iter().zip(vectors) {
                if vector.len() != dim {
                    return Err(Error::DimensionMismatch { expected: dim, actual: vector.len() });
                }
                normalize(&mut vector);
                entries.push(IndexEntry::from_chunk(chunk, vector));
            }
            pb.set_position(entries.len() as u64);
        }
        pb.finish_and_clear();
        Ok(entries)
    }
}

/// Drop repeated chunk ids, keeping the first occurrence.
fn dedup(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut seen = HashSet::new();
    chunks.into_iter().filter(|c| seen.insert(c.chunk_id())).collect()
}
