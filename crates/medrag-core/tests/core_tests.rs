use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use medrag_core::chunker::ChunkingConfig;
use medrag_core::data_processor::{load_documents, DataProcessor};

fn write_record(dir: &std::path::Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
}

#[test]
fn load_documents_joins_title_and_abstract() {
    let tmp = TempDir::new().unwrap();
    write_record(
        tmp.path(),
        "111.json",
        r#"{"pmid": "111", "title": "COPD outcomes.", "abstract": "Inhaled therapy helps.", "journal": "Thorax"}"#,
    );

    let docs = load_documents(tmp.path()).expect("load");

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "111");
    assert_eq!(docs[0].journal, "Thorax");
    assert_eq!(docs[0].text, "COPD outcomes.\n\nInhaled therapy helps.");
}

#[test]
fn load_documents_is_sorted_by_id_and_skips_invalid_records() {
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("asthma");
    fs::create_dir_all(&nested).unwrap();
    write_record(&nested, "a.json", r#"{"pmid": "300", "title": "Third.", "abstract": "", "journal": "J"}"#);
    write_record(tmp.path(), "z.json", r#"{"pmid": "100", "title": "First.", "abstract": "", "journal": "J"}"#);
    write_record(tmp.path(), "noid.json", r#"{"title": "No id here.", "abstract": "", "journal": "J"}"#);
    write_record(tmp.path(), "empty.json", r#"{"pmid": "200", "title": "", "abstract": "  ", "journal": "J"}"#);
    write_record(tmp.path(), "notes.txt", "not a record");

    let docs = load_documents(tmp.path()).expect("load");
    let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();

    assert_eq!(ids, vec!["100", "300"]);
}

#[test]
fn load_documents_rejects_malformed_json() {
    let tmp = TempDir::new().unwrap();
    write_record(tmp.path(), "bad.json", "{ not json");

    assert!(load_documents(tmp.path()).is_err());
}

#[test]
fn process_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    write_record(
        tmp.path(),
        "42.json",
        r#"{"pmid": "42", "title": "Short text.", "abstract": "", "journal": "BMJ"}"#,
    );

    let processor = DataProcessor::new(ChunkingConfig::default());
    let chunks = processor.process_directory(tmp.path()).expect("process");

    assert_eq!(chunks.len(), 1, "one short record becomes one chunk");
    assert_eq!(chunks[0].text, "Short text.");
    assert_eq!(chunks[0].chunk_id(), "42:0");
    assert_eq!(chunks[0].journal, "BMJ");
}
