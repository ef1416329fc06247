use std::path::Path;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};

use medrag_core::error::{Error, Result};

pub const CHUNK_ID: &str = "chunk_id";
pub const DOCUMENT_ID: &str = "document_id";
pub const JOURNAL: &str = "journal";
pub const CHUNK_INDEX: &str = "chunk_index";
pub const CHUNK_TEXT: &str = "chunk_text";
pub const VECTOR: &str = "vector";

/// Arrow schema of the `chunks` table for embeddings of width `dim`.
pub fn build_chunk_schema(dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(CHUNK_ID, DataType::Utf8, false),
        Field::new(DOCUMENT_ID, DataType::Utf8, false),
        Field::new(JOURNAL, DataType::Utf8, false),
        Field::new(CHUNK_INDEX, DataType::UInt32, false),
        Field::new(CHUNK_TEXT, DataType::Utf8, false),
        Field::new(
            VECTOR,
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32),
            true,
        ),
    ]))
}

/// Check a persisted table schema and return its vector dimension.
pub fn validate_schema(schema: &Schema, path: &Path) -> Result<usize> {
    for name in [CHUNK_ID, DOCUMENT_ID, JOURNAL, CHUNK_INDEX, CHUNK_TEXT, VECTOR] {
        if schema.field_with_name(name).is_err() {
            return Err(Error::SchemaMismatch { path: path.to_path_buf(), field: name.to_string() });
        }
    }
    match schema.field_with_name(VECTOR).map(|f| f.data_type()) {
        Ok(DataType::FixedSizeList(_, size)) => Ok(*size as usize),
        _ => Err(Error::SchemaMismatch { path: path.to_path_buf(), field: VECTOR.to_string() }),
    }
}
