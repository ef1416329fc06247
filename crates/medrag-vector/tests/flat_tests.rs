use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use medrag_core::chunker::ChunkingConfig;
use medrag_core::error::Error;
use medrag_core::types::Document;
use medrag_embed::HashEmbedder;
use medrag_vector::{FlatIndex, IndexBackend, VectorIndexStore};

fn docs() -> Vec<Document> {
    vec![
        Document::new("10", "Chest", "Spirometry confirms airflow limitation."),
        Document::new("11", "Chest", "Oxygen therapy prolongs survival."),
    ]
}

fn flat_store(dir: &std::path::Path) -> VectorIndexStore {
    VectorIndexStore::new(Box::new(FlatIndex::new(dir, "hash:d32")), Arc::new(HashEmbedder::new(32)))
}

fn vector_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.starts_with("vectors-"))
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn persist_keeps_current_and_previous_generation_on_disk() {
    let tmp = TempDir::new().unwrap();
    let store = flat_store(tmp.path());

    store.update(&docs()[..1], ChunkingConfig::default()).await.unwrap();
    assert_eq!(vector_files(tmp.path()), vec!["vectors-1.f32"]);

    store.update(&docs(), ChunkingConfig::default()).await.unwrap();
    assert_eq!(vector_files(tmp.path()), vec!["vectors-1.f32", "vectors-2.f32"]);
    assert!(!tmp.path().join("entries.json.tmp").exists());

    store.update(&[Document::new("12", "Chest", "Smoking cessation slows decline.")], ChunkingConfig::default()).await.unwrap();
    assert_eq!(vector_files(tmp.path()), vec!["vectors-2.f32", "vectors-3.f32"]);

    let snapshot = FlatIndex::new(tmp.path(), "hash:d32").load().unwrap().expect("committed");
    assert_eq!(snapshot.generation, 3);
    assert_eq!(snapshot.dimension, 32);
    assert_eq!(snapshot.entries.len(), 3);
}

#[tokio::test]
async fn interrupted_persist_leaves_previous_generation_readable() {
    let tmp = TempDir::new().unwrap();
    let store = flat_store(tmp.path());
    store.update(&docs(), ChunkingConfig::default()).await.unwrap();

    // Leftovers of a writer that died before the commit rename.
    fs::write(tmp.path().join("vectors-2.f32"), b"partial").unwrap();
    fs::write(tmp.path().join("entries.json.tmp"), b"{ truncated").unwrap();

    assert_eq!(store.count().await.unwrap(), 2);
    let results = store.search(&HashEmbedder::new(32).embed_text("oxygen therapy"), 1).await.unwrap();
    assert_eq!(results[0].chunk_id, "11:0");
}

#[tokio::test]
async fn entries_without_chunk_text_are_a_schema_mismatch() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("entries.json"),
        r#"{
            "format_version": 1,
            "generation": 1,
            "dimension": 2,
            "model_id": "hash:d2",
            "vectors_file": "vectors-1.f32",
            "vectors_checksum": "",
            "entries": [{"chunk_id": "1:0", "document_id": "1", "journal": "J", "chunk_index": 0}]
        }"#,
    )
    .unwrap();
    let index = FlatIndex::new(tmp.path(), "hash:d2");

    match index.search(&[1.0, 0.0], 1).await {
        Err(Error::SchemaMismatch { field, .. }) => assert_eq!(field, "chunk_text"),
        other => panic!("expected schema mismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn corrupted_vector_file_is_detected() {
    let tmp = TempDir::new().unwrap();
    let store = flat_store(tmp.path());
    store.update(&docs(), ChunkingConfig::default()).await.unwrap();

    let path = tmp.path().join("vectors-1.f32");
    let mut bytes = fs::read(&path).unwrap();
    bytes[0] ^= 0xff;
    fs::write(&path, &bytes).unwrap();
    let query = HashEmbedder::new(32).embed_text("oxygen");
    assert!(matches!(store.search(&query, 1).await, Err(Error::Storage(_))));

    bytes.truncate(8);
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(store.count().await, Err(Error::Storage(_))));
}

#[tokio::test]
async fn missing_vector_file_means_no_index() {
    let tmp = TempDir::new().unwrap();
    let store = flat_store(tmp.path());
    store.update(&docs(), ChunkingConfig::default()).await.unwrap();

    fs::remove_file(tmp.path().join("vectors-1.f32")).unwrap();

    assert!(matches!(store.count().await, Err(Error::IndexNotFound(_))));
}

#[tokio::test]
async fn destroy_removes_index_files_only() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("README"), "keep me").unwrap();
    let index = FlatIndex::new(tmp.path(), "hash:d32");
    let store = flat_store(tmp.path());
    store.update(&docs(), ChunkingConfig::default()).await.unwrap();

    index.destroy().await.unwrap();

    assert!(!index.exists().await.unwrap());
    assert!(vector_files(tmp.path()).is_empty());
    assert!(tmp.path().join("README").exists());
}
