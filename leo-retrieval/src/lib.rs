//! Document ingestion for Leo: file loaders, HTML extraction, crawling and
//! chunking.

mod crawler;
mod error;
mod file_parser;
mod html;
mod loader;
mod parser;
mod splitter;

use std::path::PathBuf;

use leo_core::Document;

pub use crawler::{SimpleCrawler, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES};
pub use error::IngestionError;
pub use file_parser::{FileParser, SUPPORTED_FILE_TYPES};
pub use html::{html_to_text, same_host_links, HtmlText};
pub use loader::{detect, load_bytes, load_file_async, load_files_async, sniff, FileKind, TextLoader};
pub use parser::{DocumentParser, MAX_CONCURRENT_FETCHES};
pub use splitter::{
    chunk_lines, RecursiveCharacterTextSplitter, RecursiveCharacterTextSplitterBuilder,
    SplitterConfigError, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_LINE_CHUNK_SIZE,
};

pub async fn load_and_split_recursive(
    paths: Vec<PathBuf>,
    splitter: &RecursiveCharacterTextSplitter,
) -> Result<Vec<Document>, IngestionError> {
    let documents = load_files_async(paths).await?;
    Ok(splitter.split_documents(&documents))
}
