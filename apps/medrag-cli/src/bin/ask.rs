use clap::Parser;
use medrag_cli::{init_tracing, load_settings, open_store, print_results};
use medrag_rag::AnswerEngine;
use tracing::info;

/// Answer a question from the indexed literature via the generation service.
#[derive(Parser)]
#[command(name = "medrag-ask")]
struct Args {
    question: String,

    /// Number of chunks to retrieve (defaults to `retrieval.k`).
    #[arg(short)]
    k: Option<usize>,

    /// Generation model (defaults to `generation.model`).
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut settings = load_settings()?;
    if let Some(model) = args.model {
        settings.generation.model = model;
    }

    let store = open_store(&settings)?;
    let engine = AnswerEngine::from_settings(&settings, store)?;
    let k = args.k.unwrap_or(settings.retrieval.k);
    info!(k, model = %settings.generation.model, "asking");
    let answer = engine.answer(&args.question, k).await?;

    println!("{}\n", answer.text);
    println!("Sources:");
    print_results(&answer.sources);
    Ok(())
}
