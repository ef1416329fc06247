use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::chunker::{chunk_corpus, ChunkingConfig};
use crate::error::Result;
use crate::types::{Chunk, Document};

/// One paper as written by the acquisition step (`<pmid>.json`).
#[derive(Debug, Deserialize)]
struct PaperRecord {
    #[serde(alias = "id", alias = "document_id")]
    pmid: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default, rename = "abstract")]
    abstract_text: String,
    #[serde(default)]
    journal: String,
}

/// Load every `*.json` paper record under `data_dir`.
///
/// Records without an id are skipped, as are records whose title and
/// abstract are both empty. The result is sorted by document id so the
/// index build does not depend on directory enumeration order.
pub fn load_documents(data_dir: &Path) -> Result<Vec<Document>> {
    let files = list_json_files(data_dir);
    let mut by_id: BTreeMap<String, Document> = BTreeMap::new();

    for path in &files {
        let raw = fs::read_to_string(path)?;
        let record: PaperRecord = serde_json::from_str(&raw)?;
        let Some(id) = record.pmid.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
            warn!(path = %path.display(), "skipping record without an id");
            continue;
        };
        let doc = Document::from_parts(id, record.journal, &record.title, &record.abstract_text);
        if doc.text.is_empty() {
            debug!(id = %doc.id, "skipping record without title or abstract");
            continue;
        }
        if by_id.contains_key(&doc.id) {
            warn!(id = %doc.id, path = %path.display(), "duplicate document id, keeping the first");
            continue;
        }
        by_id.insert(doc.id.clone(), doc);
    }

    info!(files = files.len(), documents = by_id.len(), dir = %data_dir.display(), "loaded corpus");
    Ok(by_id.into_values().collect())
}

#[derive(Debug, Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new(chunking_config: ChunkingConfig) -> Self {
        Self { chunking_config }
    }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<Chunk>> {
        let documents = load_documents(data_dir)?;
        let chunks = chunk_corpus(&documents, self.chunking_config);
        info!(documents = documents.len(), chunks = chunks.len(), "chunked corpus");
        Ok(chunks)
    }
}

fn list_json_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    files.sort();
    files
}
