use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use medrag_core::config::{expand_path, EmbeddingKind, EmbeddingSettings};
pub use medrag_core::traits::Embedder;

pub mod device;
pub mod hashing;
pub mod pool;
pub mod tokenize;

pub use hashing::HashEmbedder;

/// Sentence-transformers BERT encoder (e.g. all-MiniLM-L6-v2) with masked
/// mean pooling and L2 normalization.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
}

impl BertEmbedder {
    pub fn load(settings: &EmbeddingSettings) -> Result<Self> {
        let device = device::select_device();
        let model_dir = resolve_model_dir(&settings.model_dir)?;
        info!(model = %settings.model, dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;

        let weights = load_weights(&model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DTYPE, &device);
        let model = BertModel::load(vb, &config)?;
        info!(dim, "embedding model ready");

        Ok(Self { model, tokenizer, device, model_id: settings.model.clone(), dim, max_len: settings.max_len })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let enc = tokenize::tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let hidden = self.model.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask))?;
        let pooled = pool::masked_mean_l2(&hidden, &enc.attention_mask)?;
        let emb: Vec<f32> = pooled.squeeze(0)?.to_device(&Device::Cpu)?.to_vec1()?;
        anyhow::ensure!(emb.len() == self.dim, "model produced {} dims, expected {}", emb.len(), self.dim);
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "embedded text");
        Ok(emb)
    }
}

impl Embedder for BertEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

/// Build the embedder selected by `settings.kind`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    match settings.kind {
        EmbeddingKind::Hash => {
            anyhow::ensure!(settings.dim > 0, "embedding.dim must be at least 1");
            info!(dim = settings.dim, "using hashing embedder");
            Ok(Box::new(HashEmbedder::new(settings.dim)))
        }
        EmbeddingKind::Bert => Ok(Box::new(BertEmbedder::load(settings)?)),
    }
}

fn resolve_model_dir(configured: &str) -> Result<PathBuf> {
    let dir = expand_path(configured);
    if dir.join("config.json").exists() {
        return Ok(dir);
    }
    Err(anyhow!(
        "embedding model not found in {} (expected config.json, tokenizer.json and weights)",
        dir.display()
    ))
}

fn load_weights(dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = dir.join("pytorch_model.bin");
    let tensors = candle_core::pickle::read_all(&pickle)
        .with_context(|| format!("no model.safetensors and failed to read {}", pickle.display()))?;
    Ok(tensors.into_iter().collect())
}
