use std::path::Path;

use leo_core::{Document, Value};

use crate::loader::{detect, load_bytes, FileKind};
use crate::RecursiveCharacterTextSplitter;

pub const SUPPORTED_FILE_TYPES: &[&str] = &[
    "text/plain",
    "application/pdf",
    crate::loader::DOCX_MIME,
    "text/markdown",
    "text/html",
    "text/csv",
    "application/json",
    ".txt",
    ".pdf",
    ".docx",
    ".doc",
    ".md",
    ".html",
    ".htm",
    ".csv",
    ".json",
];

/// Turns uploaded files into chunks ready for indexing.
#[derive(Clone, Debug, Default)]
pub struct FileParser {
    splitter: RecursiveCharacterTextSplitter,
}

impl FileParser {
    pub fn new(splitter: RecursiveCharacterTextSplitter) -> Self {
        Self { splitter }
    }

    /// Loads `bytes` with the loader for their detected type and splits the
    /// result. A loader failure falls back to reading the bytes as text.
    pub fn parse_upload(&self, filename: &str, bytes: &[u8]) -> Vec<Document> {
        tracing::info!(filename, size = bytes.len(), "parsing uploaded file");
        let kind = detect(filename, bytes).unwrap_or_else(|| {
            let extension = Path::new(filename)
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or_default();
            tracing::warn!(filename, extension, "unknown file type, parsing as text");
            FileKind::Text
        });
        let file_type = kind.mime();
        tracing::info!(filename, file_type, "detected file type");

        let documents = match load_bytes(kind, bytes, filename) {
            Ok(mut documents) => {
                for doc in &mut documents {
                    doc.metadata
                        .insert("source".to_string(), Value::String(filename.to_string()));
                    doc.metadata
                        .insert("file_type".to_string(), Value::String(file_type.to_string()));
                    doc.metadata.insert(
                        "original_filename".to_string(),
                        Value::String(filename.to_string()),
                    );
                }
                documents
            }
            Err(err) => {
                tracing::error!(filename, error = %err, "error parsing file, falling back to text");
                let doc = Document {
                    id: filename.to_string(),
                    ..Document::new(String::from_utf8_lossy(bytes).into_owned())
                }
                .with_metadata("source", filename)
                .with_metadata("file_type", "text/plain")
                .with_metadata("original_filename", filename)
                .with_metadata("parsing_method", "fallback_text");
                vec![doc]
            }
        };

        let chunks = self.splitter.split_documents(&documents);
        tracing::info!(filename, chunks = chunks.len(), "created chunks");
        chunks
    }

    pub fn supported_file_types(&self) -> &'static [&'static str] {
        SUPPORTED_FILE_TYPES
    }
}
