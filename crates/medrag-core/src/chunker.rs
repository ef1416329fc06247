//! Sentence-aware chunking with sentence-level overlap.
//!
//! Sentences are accumulated greedily until the next one would push the
//! chunk past `max_words`. The following chunk is seeded with the last
//! `overlap_sentences` sentences of the one just emitted, so chunk
//! boundaries never fall inside a sentence.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::types::{Chunk, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_words: usize,
    pub overlap_sentences: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_words: 100, overlap_sentences: 1 }
    }
}

/// Words whose trailing period does not end a sentence even when a capital
/// follows ("Dr. Smith", "et al. Jones").
const ABBREVIATIONS: &[&str] = &[
    "dr.", "mr.", "mrs.", "ms.", "prof.", "fig.", "figs.", "al.", "vs.", "e.g.", "i.e.", "approx.", "vol.", "eq.",
];

/// Split `text` on Unicode sentence boundaries, dropping blank fragments.
///
/// A boundary right after a known abbreviation is not a sentence end; the
/// fragment is joined with what follows it.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut pending: Option<usize> = None;
    for (offset, segment) in text.split_sentence_bound_indices() {
        let start = *pending.get_or_insert(offset);
        let end = offset + segment.len();
        if ends_with_abbreviation(&text[start..end]) {
            continue;
        }
        sentences.push(text[start..end].trim());
        pending = None;
    }
    if let Some(start) = pending {
        sentences.push(text[start..].trim());
    }
    sentences.retain(|s| !s.is_empty());
    sentences
}

fn ends_with_abbreviation(fragment: &str) -> bool {
    fragment
        .split_whitespace()
        .next_back()
        .is_some_and(|word| ABBREVIATIONS.contains(&word.to_lowercase().as_str()))
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lazily chunk one document. Calling this again (or cloning the iterator)
/// replays the identical sequence.
pub fn chunks(document: &Document, config: ChunkingConfig) -> Chunks<'_> {
    Chunks {
        document,
        sentences: split_sentences(&document.text),
        config,
        start: 0,
        next: 0,
        words: 0,
        chunk_index: 0,
    }
}

/// Chunk documents in the order given.
pub fn chunk_corpus(documents: &[Document], config: ChunkingConfig) -> Vec<Chunk> {
    documents.iter().flat_map(|doc| chunks(doc, config)).collect()
}

/// Iterator over the chunks of a single document.
///
/// The pending chunk is always the contiguous sentence range `start..next`.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    document: &'a Document,
    sentences: Vec<&'a str>,
    config: ChunkingConfig,
    start: usize,
    next: usize,
    words: usize,
    chunk_index: usize,
}

impl Chunks<'_> {
    fn emit(&mut self, end: usize) -> Chunk {
        let chunk = Chunk {
            document_id: self.document.id.clone(),
            journal: self.document.journal.clone(),
            chunk_index: self.chunk_index,
            text: self.sentences[self.start..end].join(" "),
        };
        self.chunk_index += 1;
        chunk
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        while self.next < self.sentences.len() {
            let i = self.next;
            let sentence_words = word_count(self.sentences[i]);
            self.next += 1;

            if self.start == i || self.words + sentence_words <= self.config.max_words {
                self.words += sentence_words;
                continue;
            }

            let chunk = self.emit(i);
            // Overlap larger than the chunk just emitted reuses all of it.
            self.start = i.saturating_sub(self.config.overlap_sentences).max(self.start);
            self.words = self.sentences[self.start..=i].iter().map(|s| word_count(s)).sum();
            return Some(chunk);
        }

        if self.start < self.sentences.len() {
            let end = self.sentences.len();
            let chunk = self.emit(end);
            self.start = end;
            return Some(chunk);
        }
        None
    }
}
