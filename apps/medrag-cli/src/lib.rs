//! Shared wiring for the medrag binaries.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use medrag_core::config::{Config, Settings};
use medrag_core::traits::Embedder;
use medrag_core::types::SearchResult;
use medrag_embed::get_default_embedder;
use medrag_vector::VectorIndexStore;

const PREVIEW_CHARS: usize = 600;

/// Log to stderr, `info` unless `RUST_LOG` says otherwise.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

pub fn load_settings() -> Result<Settings> {
    Ok(Config::load()?.settings()?)
}

/// Store over the configured backend with the configured embedder.
pub fn open_store(settings: &Settings) -> Result<VectorIndexStore> {
    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
    info!(
        model = %embedder.model_id(),
        backend = ?settings.index.backend,
        dir = %settings.index.dir,
        "opened index store"
    );
    Ok(VectorIndexStore::from_settings(settings, embedder))
}

pub fn print_results(results: &[SearchResult]) {
    for (i, r) in results.iter().enumerate() {
        let preview: String = r.chunk_text.chars().take(PREVIEW_CHARS).collect();
        println!("\n{}. [{:.3}] PMID:{} | {} | chunk:{}", i + 1, r.score, r.document_id, r.journal, r.chunk_index);
        println!("   {preview}");
    }
}
