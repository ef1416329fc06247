//! Arrow encoding of index entries and the two lancedb write paths: table
//! creation in a single commit, and identity-keyed insert of unseen rows.
use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, UInt32Array};
use lancedb::{Connection, Table};

use medrag_core::error::{Error, Result};
use medrag_core::types::IndexEntry;

use crate::schema::{build_chunk_schema, CHUNK_ID};
use crate::storage_err;

pub fn entries_to_record_batch(entries: &[IndexEntry], dim: usize) -> Result<RecordBatch> {
    if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dim) {
        return Err(Error::DimensionMismatch { expected: dim, actual: bad.embedding.len() });
    }
    let schema = build_chunk_schema(dim);
    let ids: Vec<&str> = entries.iter().map(|e| e.chunk_id.as_str()).collect();
    let docs: Vec<&str> = entries.iter().map(|e| e.document_id.as_str()).collect();
    let journals: Vec<&str> = entries.iter().map(|e| e.journal.as_str()).collect();
    let indexes: Vec<u32> = entries.iter().map(|e| e.chunk_index as u32).collect();
    let texts: Vec<&str> = entries.iter().map(|e| e.chunk_text.as_str()).collect();
    let vectors = entries.iter().map(|e| Some(e.embedding.iter().map(|&x| Some(x)).collect::<Vec<_>>()));

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(docs)),
            Arc::new(StringArray::from(journals)),
            Arc::new(UInt32Array::from(indexes)),
            Arc::new(StringArray::from(texts)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim as i32)),
        ],
    )
    .map_err(storage_err)
}

/// Create table `name` holding `entries`.
pub async fn create_chunk_table(conn: &Connection, name: &str, entries: &[IndexEntry], dim: usize) -> Result<Table> {
    let batch = entries_to_record_batch(entries, dim)?;
    let schema = batch.schema();
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    conn.create_table(name, reader).execute().await.map_err(storage_err)
}

/// Insert rows whose chunk id is not already in `table`; matched rows are left untouched.
pub async fn insert_missing(table: &Table, entries: &[IndexEntry], dim: usize) -> Result<()> {
    let batch = entries_to_record_batch(entries, dim)?;
    let schema = batch.schema();
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    let mut mi = table.merge_insert(&[CHUNK_ID]);
    mi.when_not_matched_insert_all();
    let _ = mi.execute(reader).await.map_err(storage_err)?;
    Ok(())
}
