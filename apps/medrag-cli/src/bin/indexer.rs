use std::path::PathBuf;

use clap::Parser;
use medrag_cli::{init_tracing, load_settings, open_store};
use medrag_core::config::expand_path;
use medrag_core::data_processor::load_documents;
use tracing::info;

/// Chunk and embed a directory of paper records into the vector index.
#[derive(Parser)]
#[command(name = "medrag-indexer")]
struct Args {
    /// Directory of `<pmid>.json` records (defaults to `corpus.data_dir`).
    data_dir: Option<PathBuf>,

    /// Discard the existing index and build it from scratch.
    #[arg(long)]
    rebuild: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = load_settings()?;
    let data_dir = args.data_dir.unwrap_or_else(|| expand_path(&settings.corpus.data_dir));

    println!("Medical literature indexer\n==========================");
    println!("Data directory: {}", data_dir.display());
    println!("Index: {} ({:?} backend)", settings.index.dir, settings.index.backend);

    let documents = load_documents(&data_dir)?;
    info!(documents = documents.len(), rebuild = args.rebuild, "loaded corpus");
    let store = open_store(&settings)?;
    let written = if args.rebuild {
        store.rebuild(&documents, settings.chunking).await?
    } else {
        store.update(&documents, settings.chunking).await?
    };

    println!("\n✅ Indexed {} documents, {} new chunks", documents.len(), written);
    println!("📊 Index now holds {} chunks", store.count().await?);
    Ok(())
}
