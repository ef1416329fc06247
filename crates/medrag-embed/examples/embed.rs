use medrag_core::config::{EmbeddingKind, EmbeddingSettings};
use medrag_embed::get_default_embedder;

fn main() -> anyhow::Result<()> {
    let settings = EmbeddingSettings { kind: EmbeddingKind::Hash, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings)?;
    let texts = vec!["copd exacerbation".to_string(), "inhaled corticosteroids".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("model={} B={} dim={}", embedder.model_id(), embs.len(), embedder.dim());
    Ok(())
}
