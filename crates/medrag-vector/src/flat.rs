//! Flat appendable index: one little-endian `f32` vector file per generation
//! plus an `entries.json` side-table whose rows align with the vector rows.
//!
//! Persisting writes `vectors-<generation>.f32`, then `entries.json.tmp`, then
//! renames the temp file over `entries.json`. The rename is the commit point:
//! a crash before it leaves the previous generation readable. After the commit
//! only the current and the previous vector files are kept, so a reader that
//! picked up the old manifest can still open its vectors. A reader that falls
//! further behind re-reads the manifest and follows it to the newer generation.

use std::collections::HashSet;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use medrag_core::config::BackendKind;
use medrag_core::error::{Error, Result};
use medrag_core::types::{ChunkId, IndexEntry, SearchResult};

use crate::backend::IndexBackend;
use crate::search::score_entries;

pub const MANIFEST_FILE: &str = "entries.json";
const MANIFEST_TMP: &str = "entries.json.tmp";
const FORMAT_VERSION: u32 = 1;
/// How many times a reader follows a newer manifest after its vector file vanished.
const MANIFEST_RETRIES: usize = 3;

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    generation: u64,
    dimension: usize,
    model_id: String,
    vectors_file: String,
    vectors_checksum: String,
    entries: Vec<EntryRecord>,
}

impl Manifest {
    fn expected_len(&self) -> usize {
        self.entries.len() * self.dimension * 4
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    chunk_id: ChunkId,
    document_id: String,
    journal: String,
    chunk_index: usize,
    #[serde(default)]
    chunk_text: Option<String>,
}

/// Fully loaded copy of one committed generation.
#[derive(Debug, Clone, Default)]
pub struct FlatSnapshot {
    pub generation: u64,
    pub dimension: usize,
    pub model_id: String,
    pub entries: Vec<IndexEntry>,
}

pub struct FlatIndex {
    dir: PathBuf,
    model_id: String,
}

impl FlatIndex {
    pub fn new(dir: impl Into<PathBuf>, model_id: impl Into<String>) -> Self {
        Self { dir: dir.into(), model_id: model_id.into() }
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Load the committed generation, or `None` if no index is present.
    pub fn load(&self) -> Result<Option<FlatSnapshot>> {
        match self.read_manifest()? {
            Some(manifest) => self.load_from(manifest),
            None => Ok(None),
        }
    }

    fn read_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.manifest_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let manifest: Manifest = serde_json::from_str(&raw)?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(Error::Storage(format!(
                "{} has format version {}, expected {FORMAT_VERSION}",
                path.display(),
                manifest.format_version
            )));
        }
        if manifest.entries.iter().any(|e| e.chunk_text.is_none()) {
            return Err(Error::SchemaMismatch { path, field: "chunk_text".to_string() });
        }
        Ok(Some(manifest))
    }

    /// Open the vector file `manifest` points at with `open`.
    ///
    /// A writer may commit and prune between our manifest read and the open.
    /// When the file is gone the manifest is read again and, if it moved to a
    /// newer generation, followed. A missing file under an unchanged manifest
    /// means the index is absent.
    fn open_vectors<T>(
        &self,
        mut manifest: Manifest,
        open: impl Fn(&Path) -> io::Result<T>,
    ) -> Result<Option<(Manifest, PathBuf, T)>> {
        for _ in 0..=MANIFEST_RETRIES {
            let path = self.dir.join(&manifest.vectors_file);
            match open(&path) {
                Ok(value) => return Ok(Some((manifest, path, value))),
                Err(e) if e.kind() == ErrorKind::NotFound => match self.read_manifest()? {
                    Some(next) if next.generation != manifest.generation => {
                        debug!(from = manifest.generation, to = next.generation, "manifest moved while reading");
                        manifest = next;
                    }
                    _ => {
                        warn!(path = %path.display(), "vector file missing, treating index as absent");
                        return Ok(None);
                    }
                },
                Err(e) => return Err(e.into()),
            }
        }
        warn!(dir = %self.dir.display(), "index kept changing while reading, treating it as absent");
        Ok(None)
    }

    fn load_from(&self, manifest: Manifest) -> Result<Option<FlatSnapshot>> {
        let Some((manifest, vectors_path, bytes)) = self.open_vectors(manifest, |p| fs::read(p))? else {
            return Ok(None);
        };
        check_len(&manifest, &vectors_path, bytes.len())?;
        if blake3::hash(&bytes).to_hex().as_str() != manifest.vectors_checksum {
            return Err(Error::Storage(format!("checksum mismatch for {}", vectors_path.display())));
        }
        if manifest.model_id != self.model_id {
            warn!(
                index_model = %manifest.model_id,
                embedder_model = %self.model_id,
                "index was built with a different embedding model"
            );
        }

        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let dimension = manifest.dimension;
        let entries = manifest
            .entries
            .into_iter()
            .enumerate()
            .map(|(row, e)| IndexEntry {
                chunk_id: e.chunk_id,
                embedding: values[row * dimension..(row + 1) * dimension].to_vec(),
                chunk_text: e.chunk_text.unwrap_or_default(),
                journal: e.journal,
                document_id: e.document_id,
                chunk_index: e.chunk_index,
            })
            .collect();

        debug!(generation = manifest.generation, dir = %self.dir.display(), "loaded flat index");
        Ok(Some(FlatSnapshot { generation: manifest.generation, dimension, model_id: manifest.model_id, entries }))
    }

    /// Manifest of the committed generation whose vector file is present and
    /// sized right. Neither reads nor checksums the vectors.
    fn committed(&self) -> Result<Option<Manifest>> {
        let Some(manifest) = self.read_manifest()? else { return Ok(None) };
        let Some((manifest, path, meta)) = self.open_vectors(manifest, |p| fs::metadata(p))? else {
            return Ok(None);
        };
        check_len(&manifest, &path, meta.len() as usize)?;
        Ok(Some(manifest))
    }

    /// Commit `snapshot` as the next generation.
    pub fn persist(&self, snapshot: &FlatSnapshot) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let generation = snapshot.generation + 1;
        let vectors_file = vectors_file_name(generation);

        let mut bytes = Vec::with_capacity(snapshot.entries.len() * snapshot.dimension * 4);
        for entry in &snapshot.entries {
            if entry.embedding.len() != snapshot.dimension {
                return Err(Error::DimensionMismatch { expected: snapshot.dimension, actual: entry.embedding.len() });
            }
            for x in &entry.embedding {
                bytes.extend_from_slice(&x.to_le_bytes());
            }
        }
        write_synced(&self.dir.join(&vectors_file), &bytes)?;

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            generation,
            dimension: snapshot.dimension,
            model_id: snapshot.model_id.clone(),
            vectors_file: vectors_file.clone(),
            vectors_checksum: blake3::hash(&bytes).to_hex().to_string(),
            entries: snapshot
                .entries
                .iter()
                .map(|e| EntryRecord {
                    chunk_id: e.chunk_id.clone(),
                    document_id: e.document_id.clone(),
                    journal: e.journal.clone(),
                    chunk_index: e.chunk_index,
                    chunk_text: Some(e.chunk_text.clone()),
                })
                .collect(),
        };
        let tmp = self.dir.join(MANIFEST_TMP);
        write_synced(&tmp, &serde_json::to_vec(&manifest)?)?;
        fs::rename(&tmp, self.manifest_path())?;

        let previous = vectors_file_name(snapshot.generation);
        self.remove_stale_vectors(&[vectors_file.as_str(), previous.as_str()]);
        info!(generation, entries = snapshot.entries.len(), dir = %self.dir.display(), "committed flat index");
        Ok(())
    }

    fn remove_stale_vectors(&self, keep: &[&str]) {
        let Ok(read_dir) = fs::read_dir(&self.dir) else { return };
        for entry in read_dir.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("vectors-") && name.ends_with(".f32") && !keep.contains(&name.as_ref()) {
                if let Err(e) = fs::remove_file(entry.path()) {
                    warn!(file = %name, error = %e, "failed to remove stale vector file");
                }
            }
        }
    }
}

fn vectors_file_name(generation: u64) -> String {
    format!("vectors-{generation}.f32")
}

fn check_len(manifest: &Manifest, path: &Path, actual: usize) -> Result<()> {
    let expected = manifest.expected_len();
    if actual != expected {
        return Err(Error::Storage(format!("{} holds {actual} bytes, expected {expected}", path.display())));
    }
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

#[async_trait]
impl IndexBackend for FlatIndex {
    fn kind(&self) -> BackendKind {
        BackendKind::Flat
    }

    fn location(&self) -> &Path {
        &self.dir
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.committed()?.is_some())
    }

    async fn destroy(&self) -> Result<()> {
        for name in [MANIFEST_FILE, MANIFEST_TMP] {
            match fs::remove_file(self.dir.join(name)) {
                Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
        self.remove_stale_vectors(&[]);
        Ok(())
    }

    async fn chunk_ids(&self) -> Result<HashSet<ChunkId>> {
        Ok(self
            .committed()?
            .map(|manifest| manifest.entries.into_iter().map(|e| e.chunk_id).collect())
            .unwrap_or_default())
    }

    async fn append(&self, entries: Vec<IndexEntry>) -> Result<usize> {
        let Some(first) = entries.first() else { return Ok(0) };
        let mut snapshot = self.load()?.unwrap_or_else(|| FlatSnapshot {
            generation: 0,
            dimension: first.embedding.len(),
            model_id: self.model_id.clone(),
            entries: Vec::new(),
        });

        let mut seen: HashSet<ChunkId> = snapshot.entries.iter().map(|e| e.chunk_id.clone()).collect();
        let before = snapshot.entries.len();
        for entry in entries {
            if seen.insert(entry.chunk_id.clone()) {
                snapshot.entries.push(entry);
            }
        }
        let added = snapshot.entries.len() - before;
        if added == 0 {
            return Ok(0);
        }
        self.persist(&snapshot)?;
        Ok(added)
    }

    async fn count(&self) -> Result<usize> {
        match self.committed()? {
            Some(manifest) => Ok(manifest.entries.len()),
            None => Err(Error::IndexNotFound(self.dir.clone())),
        }
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let snapshot = self.load()?.ok_or_else(|| Error::IndexNotFound(self.dir.clone()))?;
        if query.len() != snapshot.dimension {
            return Err(Error::DimensionMismatch { expected: snapshot.dimension, actual: query.len() });
        }
        Ok(score_entries(&snapshot.entries, query, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            chunk_id: id.to_string(),
            embedding,
            chunk_text: format!("text of {id}"),
            journal: "J".to_string(),
            document_id: id.split(':').next().unwrap_or(id).to_string(),
            chunk_index: 0,
        }
    }

    fn commit(index: &FlatIndex, generation: u64, ids: &[&str]) {
        let entries = ids.iter().map(|id| entry(id, vec![1.0, 0.0])).collect();
        let snapshot = FlatSnapshot { generation, dimension: 2, model_id: "hash:d2".to_string(), entries };
        index.persist(&snapshot).unwrap();
    }

    #[test]
    fn reader_holding_a_pruned_manifest_follows_the_new_one() {
        let tmp = TempDir::new().unwrap();
        let index = FlatIndex::new(tmp.path(), "hash:d2");
        commit(&index, 0, &["1:0"]);
        let stale = index.read_manifest().unwrap().unwrap();

        // Two more commits land before the reader opens its vector file.
        commit(&index, 1, &["1:0", "2:0"]);
        commit(&index, 2, &["1:0", "2:0", "3:0"]);
        assert!(!tmp.path().join("vectors-1.f32").exists());

        let snapshot = index.load_from(stale).unwrap().expect("follows the newer manifest");
        assert_eq!(snapshot.generation, 3);
        assert_eq!(snapshot.entries.len(), 3);
    }

    #[test]
    fn reader_one_generation_behind_still_opens_its_vectors() {
        let tmp = TempDir::new().unwrap();
        let index = FlatIndex::new(tmp.path(), "hash:d2");
        commit(&index, 0, &["1:0"]);
        let stale = index.read_manifest().unwrap().unwrap();

        commit(&index, 1, &["1:0", "2:0"]);

        let snapshot = index.load_from(stale).unwrap().expect("previous generation kept");
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.entries.len(), 1);
    }

    #[test]
    fn count_does_not_read_vectors() {
        let tmp = TempDir::new().unwrap();
        let index = FlatIndex::new(tmp.path(), "hash:d2");
        commit(&index, 0, &["1:0", "2:0"]);

        // Same length, wrong bytes: only a full load notices.
        fs::write(tmp.path().join("vectors-1.f32"), [0u8; 16]).unwrap();

        let committed = index.committed().unwrap().expect("present and sized right");
        assert_eq!(committed.entries.len(), 2);
        assert!(matches!(index.load(), Err(Error::Storage(_))));
    }
}
