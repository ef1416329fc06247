use pretty_assertions::assert_eq;

use medrag_core::chunker::{chunk_corpus, chunks, split_sentences, ChunkingConfig};
use medrag_core::types::Document;

fn config(max_words: usize, overlap_sentences: usize) -> ChunkingConfig {
    ChunkingConfig { max_words, overlap_sentences }
}

fn texts(doc: &Document, cfg: ChunkingConfig) -> Vec<String> {
    chunks(doc, cfg).map(|c| c.text).collect()
}

const ABSTRACT: &str = "Chronic obstructive pulmonary disease is a leading cause of death. \
    Long-acting bronchodilators reduce exacerbations in moderate disease. \
    Inhaled corticosteroids add benefit for patients with high eosinophil counts. \
    Pulmonary rehabilitation improves exercise capacity and quality of life. \
    Smoking cessation remains the only intervention shown to slow decline. \
    Further trials are needed.";

#[test]
fn three_sentences_with_one_sentence_overlap() {
    let doc = Document::new("1", "J", "A. B. C.");

    let out: Vec<_> = chunks(&doc, config(2, 1)).collect();

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].chunk_index, 0);
    assert_eq!(out[0].text, "A. B.");
    assert_eq!(out[1].chunk_index, 1);
    assert_eq!(out[1].text, "B. C.");
    assert_eq!(out[1].chunk_id(), "1:1");
    assert_eq!(out[1].journal, "J");
}

#[test]
fn empty_document_yields_no_chunks() {
    let doc = Document::new("1", "J", "   \n ");
    assert_eq!(chunks(&doc, config(10, 1)).count(), 0);
}

#[test]
fn oversized_sentence_is_its_own_chunk() {
    let doc = Document::new("7", "J", "Short one. This sentence has far too many words for the budget. Tail.");

    let out = texts(&doc, config(3, 0));

    assert_eq!(
        out,
        vec![
            "Short one.".to_string(),
            "This sentence has far too many words for the budget.".to_string(),
            "Tail.".to_string(),
        ]
    );
}

#[test]
fn oversized_first_sentence_does_not_emit_an_empty_chunk() {
    let doc = Document::new("7", "J", "One two three four five. Six.");

    let out = texts(&doc, config(2, 0));

    assert_eq!(out, vec!["One two three four five.".to_string(), "Six.".to_string()]);
}

#[test]
fn overlap_larger_than_chunk_reuses_whole_chunk() {
    let doc = Document::new("9", "J", "A. B. C. D.");

    let out = texts(&doc, config(2, 10));

    // Each emission carries every sentence of the previous chunk forward.
    assert_eq!(out[0], "A. B.");
    assert_eq!(out[1], "A. B. C.");
    assert_eq!(out[2], "A. B. C. D.");
    assert_eq!(out.len(), 3);
}

#[test]
fn remaining_sentences_form_final_chunk_under_budget() {
    let doc = Document::new("3", "J", "Alpha beta. Gamma.");
    assert_eq!(texts(&doc, config(100, 1)), vec!["Alpha beta. Gamma.".to_string()]);
}

#[test]
fn chunking_is_deterministic_and_restartable() {
    let doc = Document::new("55", "Lancet", ABSTRACT);
    let cfg = config(20, 1);

    let first: Vec<_> = chunks(&doc, cfg).collect();
    let second: Vec<_> = chunks(&doc, cfg).collect();
    let iter = chunks(&doc, cfg);
    let cloned: Vec<_> = iter.clone().collect();

    assert_eq!(first, second);
    assert_eq!(first, cloned);
    let ids: Vec<String> = first.iter().map(|c| c.chunk_id()).collect();
    let expected: Vec<String> = (0..first.len()).map(|i| format!("55:{i}")).collect();
    assert_eq!(ids, expected);
}

#[test]
fn chunks_cover_contiguous_sentence_runs() {
    let doc = Document::new("55", "Lancet", ABSTRACT);
    let sentences = split_sentences(ABSTRACT);
    assert_eq!(sentences.len(), 6);

    for cfg in [config(5, 0), config(12, 1), config(20, 2), config(1000, 1)] {
        let mut covered = vec![false; sentences.len()];
        for chunk in chunks(&doc, cfg) {
            let parts = split_sentences(&chunk.text);
            let start = sentences
                .iter()
                .position(|s| *s == parts[0])
                .expect("chunk starts on a document sentence");
            assert_eq!(&sentences[start..start + parts.len()], parts.as_slice());
            for flag in &mut covered[start..start + parts.len()] {
                *flag = true;
            }
        }
        assert!(covered.iter().all(|c| *c), "every sentence is covered for {cfg:?}");
    }
}

#[test]
fn chunks_respect_budget_unless_single_sentence() {
    let doc = Document::new("55", "Lancet", ABSTRACT);
    let cfg = config(20, 0);

    for chunk in chunks(&doc, cfg) {
        let words = chunk.text.split_whitespace().count();
        let sentence_count = split_sentences(&chunk.text).len();
        assert!(words <= cfg.max_words || sentence_count == 1, "chunk over budget: {}", chunk.text);
    }
}

#[test]
fn corpus_chunking_keeps_document_order() {
    let docs = vec![Document::new("b", "J", "One. Two."), Document::new("a", "J", "Three.")];

    let out = chunk_corpus(&docs, config(1, 0));
    let ids: Vec<String> = out.iter().map(|c| c.chunk_id()).collect();

    assert_eq!(ids, vec!["b:0", "b:1", "a:0"]);
}

#[test]
fn abbreviations_do_not_end_sentences() {
    let text = "Dr. Smith enrolled 40 patients. Results matched Fig. 2 of Lee et al. Jones disagreed. \
        Adjuvants (e.g. alum) were avoided.";

    assert_eq!(
        split_sentences(text),
        vec![
            "Dr. Smith enrolled 40 patients.",
            "Results matched Fig. 2 of Lee et al. Jones disagreed.",
            "Adjuvants (e.g. alum) were avoided.",
        ]
    );
}

#[test]
fn trailing_abbreviation_keeps_its_fragment() {
    assert_eq!(split_sentences("Asthma improved. Seen by Dr."), vec!["Asthma improved.", "Seen by Dr."]);
}
