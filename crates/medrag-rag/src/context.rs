//! Grounding context and prompt construction.

use medrag_core::types::SearchResult;

pub const DEFAULT_CONTEXT_BUDGET: usize = 8000;

const BLOCK_SEPARATOR: &str = "\n\n";

pub const SYSTEM_INSTRUCTION: &str = "You are a careful medical research assistant. \
Answer ONLY using the provided context. Cite PMIDs where relevant. \
If the context is insufficient, say so and suggest what to search next.";

/// Render one retrieved chunk as a citable block. `rank` starts at 1.
pub fn format_block(rank: usize, result: &SearchResult) -> String {
    let text = result.chunk_text.trim().replace("\r\n", " ").replace(['\n', '\r'], " ");
    format!(
        "[{rank}] PMID:{} | {} | chunk:{}\n{text}",
        result.document_id, result.journal, result.chunk_index
    )
}

/// Packs ranked results into a character-bounded context string.
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    budget_chars: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_BUDGET)
    }
}

impl ContextAssembler {
    pub fn new(budget_chars: usize) -> Self {
        Self { budget_chars }
    }

    pub fn budget_chars(&self) -> usize {
        self.budget_chars
    }

    /// Join blocks in rank order while the total stays within budget.
    ///
    /// Assembly stops at the first block that would overflow, so the output
    /// is the longest fitting prefix of whole blocks. Lengths are counted in
    /// characters, separators included.
    pub fn assemble(&self, results: &[SearchResult]) -> String {
        let mut context = String::new();
        let mut used = 0usize;
        for (i, result) in results.iter().enumerate() {
            let block = format_block(i + 1, result);
            let sep = if context.is_empty() { 0 } else { BLOCK_SEPARATOR.len() };
            let cost = sep + block.chars().count();
            if used + cost > self.budget_chars {
                break;
            }
            if sep > 0 {
                context.push_str(BLOCK_SEPARATOR);
            }
            context.push_str(&block);
            used += cost;
        }
        context
    }
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!("{SYSTEM_INSTRUCTION}\n\nContext:\n{context}\n\nQuestion: {question}\nAnswer:")
}
