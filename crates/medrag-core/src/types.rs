//! Domain types shared by the chunker, the index store and the answer engine.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Build the deterministic identity of a chunk: `document_id:chunk_index`.
pub fn chunk_id(document_id: &str, chunk_index: usize) -> ChunkId {
    format!("{document_id}:{chunk_index}")
}

/// A source paper as produced by the acquisition step.
///
/// - `id`: stable external identifier (the PMID)
/// - `journal`: journal title, carried through to citations
/// - `text`: title and abstract, concatenated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub journal: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, journal: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), journal: journal.into(), text: text.into() }
    }

    /// Join title and abstract the way the index expects them.
    pub fn from_parts(id: impl Into<String>, journal: impl Into<String>, title: &str, abstract_text: &str) -> Self {
        let text = format!("{title}\n\n{abstract_text}").trim().to_string();
        Self::new(id, journal, text)
    }
}

/// A sentence-aligned slice of a document; the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: String,
    pub journal: String,
    pub chunk_index: usize,
    pub text: String,
}

impl Chunk {
    pub fn chunk_id(&self) -> ChunkId {
        chunk_id(&self.document_id, self.chunk_index)
    }
}

/// The persisted unit of the vector index. `chunk_id` is the primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk_id: ChunkId,
    pub embedding: Vec<f32>,
    pub chunk_text: String,
    pub journal: String,
    pub document_id: String,
    pub chunk_index: usize,
}

impl IndexEntry {
    pub fn from_chunk(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            chunk_id: chunk.chunk_id(),
            embedding,
            chunk_text: chunk.text,
            journal: chunk.journal,
            document_id: chunk.document_id,
            chunk_index: chunk.chunk_index,
        }
    }
}

/// A ranked hit. Higher `score` is better; it is the inner product of
/// unit-length vectors, i.e. cosine similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: ChunkId,
    pub score: f32,
    pub chunk_text: String,
    pub journal: String,
    pub document_id: String,
    pub chunk_index: usize,
}

/// A generated answer together with every retrieved source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SearchResult>,
}
