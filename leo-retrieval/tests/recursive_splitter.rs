use std::collections::HashMap;

use leo_core::Document;
use serde_json::json;
use leo_retrieval::{chunk_lines, RecursiveCharacterTextSplitter, SplitterConfigError};

fn splitter(chunk_size: usize, chunk_overlap: usize) -> RecursiveCharacterTextSplitter {
    RecursiveCharacterTextSplitter::builder()
        .chunk_size(chunk_size)
        .chunk_overlap(chunk_overlap)
        .build()
        .unwrap()
}

#[test]
fn paragraphs_split_before_lines_and_words() {
    let text = "aa aa\n\nbb bb\n\ncc cc";
    let chunks = splitter(8, 0).split_text(text);

    assert_eq!(chunks, vec!["aa aa\n\n", "bb bb\n\n", "cc cc"]);
    assert_eq!(chunks.concat(), text);
}

#[test]
fn long_paragraph_falls_back_to_words() {
    let chunks = splitter(12, 0).split_text("one two three four\n\nfive");
    assert_eq!(chunks, vec!["one two ", "three four\n\n", "five"]);
}

#[test]
fn multibyte_text_is_split_on_char_boundaries() {
    let text = "a🙂b🙂c🙂";
    let chunks = splitter(3, 0).split_text(text);

    assert_eq!(chunks.concat(), text);
    assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 3));
}

#[test]
fn overlap_repeats_the_tail_of_the_previous_chunk() {
    assert_eq!(splitter(4, 1).split_text("abcdefghij"), vec!["abcd", "defg", "ghij"]);
}

#[test]
fn oversized_overlap_is_clamped() {
    assert_eq!(splitter(3, 9).split_text("abcd"), vec!["abc", "bcd"]);
}

#[test]
fn zero_chunk_size_is_rejected() {
    let error = RecursiveCharacterTextSplitter::builder()
        .chunk_size(0)
        .build()
        .unwrap_err();
    assert_eq!(error, SplitterConfigError::ChunkSizeMustBeGreaterThanZero);
}

#[test]
fn split_documents_copies_metadata_and_numbers_chunks() {
    let mut metadata = HashMap::new();
    metadata.insert("source".to_string(), json!("biology.pdf"));
    let doc = Document {
        id: "bio".to_string(),
        content: "one two three".to_string(),
        metadata,
        embedding: None,
    };

    let chunks = splitter(5, 0).split_documents(&[doc]);

    assert_eq!(chunks.len(), 3);
    for (index, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.id, format!("bio:{index}"));
        assert_eq!(chunk.metadata.get("source"), Some(&json!("biology.pdf")));
        assert_eq!(chunk.metadata.get("chunk_index"), Some(&json!(index)));
    }
}

#[test]
fn chunk_lines_starts_new_chunk_at_limit() {
    let lines: Vec<String> = (0..6).map(|i| format!("line-{i}")).collect();
    let chunks = chunk_lines(&lines, 14);
    assert_eq!(chunks, vec!["line-0\nline-1", "line-2\nline-3", "line-4\nline-5"]);
}
