//! Question answering over the chunk index: retrieval, grounded context
//! assembly and generation.

pub mod answer;
pub mod context;
pub mod generation;
pub mod retriever;

pub use answer::AnswerEngine;
pub use context::{build_prompt, format_block, ContextAssembler, SYSTEM_INSTRUCTION};
pub use generation::{Generator, OllamaGenerator};
pub use retriever::Retriever;
