use tracing::info;

use medrag_core::config::Settings;
use medrag_core::error::Result;
use medrag_core::types::{Answer, SearchResult};
use medrag_vector::VectorIndexStore;

use crate::context::{build_prompt, ContextAssembler};
use crate::generation::{Generator, OllamaGenerator};
use crate::retriever::Retriever;

/// Retrieve, assemble a grounded prompt, generate.
pub struct AnswerEngine {
    store: VectorIndexStore,
    generator: Box<dyn Generator>,
    assembler: ContextAssembler,
}

impl AnswerEngine {
    pub fn new(store: VectorIndexStore, generator: Box<dyn Generator>, assembler: ContextAssembler) -> Self {
        Self { store, generator, assembler }
    }

    /// Wire an Ollama generator and the configured context budget around `store`.
    pub fn from_settings(settings: &Settings, store: VectorIndexStore) -> Result<Self> {
        let generator = OllamaGenerator::new(&settings.generation)?;
        Ok(Self::new(store, Box::new(generator), ContextAssembler::new(settings.retrieval.context_budget_chars)))
    }

    pub fn store(&self) -> &VectorIndexStore {
        &self.store
    }

    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        Retriever::new(&self.store).retrieve(question, k).await
    }

    /// Answer `question` from the top `k` chunks.
    ///
    /// `sources` holds every retrieved chunk, including any the context
    /// budget left out of the prompt. No retrieved chunks still produces a
    /// prompt, with an empty context.
    pub async fn answer(&self, question: &str, k: usize) -> Result<Answer> {
        let sources = self.retrieve(question, k).await?;
        let context = self.assembler.assemble(&sources);
        let prompt = build_prompt(&context, question);
        info!(
            sources = sources.len(),
            context_chars = context.chars().count(),
            budget = self.assembler.budget_chars(),
            "generating answer"
        );

        let text = self.generator.generate(&prompt).await?;
        Ok(Answer { text: text.trim().to_string(), sources })
    }
}
