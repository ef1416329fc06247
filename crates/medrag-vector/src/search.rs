//! Scoring, deterministic ranking, and decoding of result batches shared by
//! both backends.

use std::path::Path;

use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, UInt32Type};
use arrow_array::{Array, RecordBatch};
use ordered_float::OrderedFloat;

use medrag_core::error::{Error, Result};
use medrag_core::traits::dot;
use medrag_core::types::{IndexEntry, SearchResult};

use crate::schema::{CHUNK_ID, CHUNK_INDEX, CHUNK_TEXT, DOCUMENT_ID, JOURNAL, VECTOR};

/// Sort by descending score, break ties by ascending chunk id, keep `k`.
pub fn rank(mut results: Vec<SearchResult>, k: usize) -> Vec<SearchResult> {
    results.sort_by(|a, b| {
        OrderedFloat(b.score)
            .cmp(&OrderedFloat(a.score))
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    results.truncate(k);
    results
}

/// Exact inner-product scoring of `entries` against `query`, ranked.
pub fn score_entries<'a, I>(entries: I, query: &[f32], k: usize) -> Vec<SearchResult>
where
    I: IntoIterator<Item = &'a IndexEntry>,
{
    let scored = entries
        .into_iter()
        .map(|e| SearchResult {
            chunk_id: e.chunk_id.clone(),
            score: dot(&e.embedding, query),
            chunk_text: e.chunk_text.clone(),
            journal: e.journal.clone(),
            document_id: e.document_id.clone(),
            chunk_index: e.chunk_index,
        })
        .collect();
    rank(scored, k)
}

fn missing(path: &Path, field: &str) -> Error {
    Error::SchemaMismatch { path: path.to_path_buf(), field: field.to_string() }
}

/// Read the `chunk_id` column of a batch.
pub fn decode_chunk_ids(batch: &RecordBatch, path: &Path) -> Result<Vec<String>> {
    let ids = batch
        .column_by_name(CHUNK_ID)
        .and_then(|c| c.as_string_opt::<i32>())
        .ok_or_else(|| missing(path, CHUNK_ID))?;
    Ok(ids.iter().flatten().map(str::to_string).collect())
}

/// Decode full rows (including vectors) of a `chunks` table batch.
pub fn decode_entries(batch: &RecordBatch, path: &Path) -> Result<Vec<IndexEntry>> {
    let string_col = |name: &str| {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_string_opt::<i32>())
            .ok_or_else(|| missing(path, name))
    };
    let ids = string_col(CHUNK_ID)?;
    let docs = string_col(DOCUMENT_ID)?;
    let journals = string_col(JOURNAL)?;
    let texts = string_col(CHUNK_TEXT)?;
    let indexes = batch
        .column_by_name(CHUNK_INDEX)
        .and_then(|c| c.as_primitive_opt::<UInt32Type>())
        .ok_or_else(|| missing(path, CHUNK_INDEX))?;
    let vectors = batch
        .column_by_name(VECTOR)
        .and_then(|c| c.as_fixed_size_list_opt())
        .ok_or_else(|| missing(path, VECTOR))?;

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        if vectors.is_null(i) {
            return Err(Error::Storage(format!("row {} of {} has no vector", ids.value(i), path.display())));
        }
        let row = vectors.value(i);
        let values = row.as_primitive_opt::<Float32Type>().ok_or_else(|| missing(path, VECTOR))?;
        out.push(IndexEntry {
            chunk_id: ids.value(i).to_string(),
            embedding: values.values().to_vec(),
            chunk_text: texts.value(i).to_string(),
            journal: journals.value(i).to_string(),
            document_id: docs.value(i).to_string(),
            chunk_index: indexes.value(i) as usize,
        });
    }
    Ok(out)
}
