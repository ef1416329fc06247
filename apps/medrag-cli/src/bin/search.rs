use clap::Parser;
use medrag_cli::{init_tracing, load_settings, open_store, print_results};
use medrag_rag::Retriever;

/// Print the chunks most similar to a query.
#[derive(Parser)]
#[command(name = "medrag-search")]
struct Args {
    query: String,

    /// Number of results (defaults to `retrieval.k`).
    #[arg(short)]
    k: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = load_settings()?;
    let store = open_store(&settings)?;

    let k = args.k.unwrap_or(settings.retrieval.k);
    let results = Retriever::new(&store).retrieve(&args.query, k).await?;

    println!("🔍 {} results for '{}'", results.len(), args.query);
    print_results(&results);
    Ok(())
}
