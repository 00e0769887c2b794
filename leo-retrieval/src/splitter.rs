use leo_core::{Document, Value};
use thiserror::Error;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_LINE_CHUNK_SIZE: usize = 500;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitterConfigError {
    #[error("chunk_size must be greater than zero")]
    ChunkSizeMustBeGreaterThanZero,
    #[error("at least one separator is required")]
    NoSeparators,
}

/// Splits text on the first separator that occurs, recursing into pieces
/// that are still too long, then packs pieces into chunks of at most
/// `chunk_size` characters with `chunk_overlap` characters carried over.
///
/// Separators stay attached to the piece they end, so with no overlap the
/// chunks concatenate back to the input.
#[derive(Clone, Debug)]
pub struct RecursiveCharacterTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for RecursiveCharacterTextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecursiveCharacterTextSplitterBuilder {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterTextSplitterBuilder {
    pub fn chunk_size(mut self, value: usize) -> Self {
        self.chunk_size = value;
        self
    }

    pub fn chunk_overlap(mut self, value: usize) -> Self {
        self.chunk_overlap = value;
        self
    }

    pub fn separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<RecursiveCharacterTextSplitter, SplitterConfigError> {
        if self.chunk_size == 0 {
            return Err(SplitterConfigError::ChunkSizeMustBeGreaterThanZero);
        }
        if self.separators.is_empty() {
            return Err(SplitterConfigError::NoSeparators);
        }
        Ok(RecursiveCharacterTextSplitter {
            chunk_size: self.chunk_size,
            // overlap must leave room for progress
            chunk_overlap: self.chunk_overlap.min(self.chunk_size - 1),
            separators: self.separators,
        })
    }
}

impl RecursiveCharacterTextSplitter {
    pub fn builder() -> RecursiveCharacterTextSplitterBuilder {
        let defaults = Self::default();
        RecursiveCharacterTextSplitterBuilder {
            chunk_size: defaults.chunk_size,
            chunk_overlap: defaults.chunk_overlap,
            separators: defaults.separators,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut pieces = Vec::new();
        self.atomize(text, &self.separators, &mut pieces);
        self.merge(&pieces)
    }

    /// Splits every document; chunks keep the source metadata plus `chunk_index`
    /// and get the id `"{id}:{chunk_index}"`. Blank chunks are dropped.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        let mut out = Vec::new();
        for doc in documents {
            let chunks = self
                .split_text(&doc.content)
                .into_iter()
                .filter(|chunk| !chunk.trim().is_empty());
            for (chunk_index, content) in chunks.enumerate() {
                let mut metadata = doc.metadata.clone();
                metadata.insert("chunk_index".to_string(), Value::from(chunk_index));
                out.push(Document {
                    id: format!("{}:{chunk_index}", doc.id),
                    content,
                    metadata,
                    embedding: None,
                });
            }
        }
        out
    }

    fn atomize<'a>(&self, text: &'a str, separators: &[String], out: &mut Vec<&'a str>) {
        let Some(position) = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep.as_str()))
        else {
            out.push(text);
            return;
        };
        let separator = &separators[position];
        let remaining = &separators[position + 1..];

        if separator.is_empty() {
            let mut start = 0;
            for (offset, _) in text.char_indices().skip(1) {
                out.push(&text[start..offset]);
                start = offset;
            }
            out.push(&text[start..]);
            return;
        }

        for piece in text.split_inclusive(separator.as_str()) {
            if piece.chars().count() <= self.chunk_size {
                out.push(piece);
            } else {
                self.atomize(piece, remaining, out);
            }
        }
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: Vec<(&str, usize)> = Vec::new();
        let mut window_len = 0usize;

        for piece in pieces {
            let len = piece.chars().count();
            if window_len + len > self.chunk_size && !window.is_empty() {
                chunks.push(window.iter().map(|(text, _)| *text).collect::<String>());
                while !window.is_empty()
                    && (window_len > self.chunk_overlap || window_len + len > self.chunk_size)
                {
                    let (_, dropped) = window.remove(0);
                    window_len -= dropped;
                }
            }
            window.push((piece, len));
            window_len += len;
        }

        if !window.is_empty() {
            chunks.push(window.iter().map(|(text, _)| *text).collect());
        }
        chunks
    }
}

/// Packs lines into chunks of roughly `chunk_size` characters, counting one
/// newline per line. A single line longer than `chunk_size` becomes its own chunk.
pub fn chunk_lines<S: AsRef<str>>(lines: &[S], chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_size = 0usize;

    for line in lines {
        let line = line.as_ref();
        let line_length = line.chars().count() + 1;

        if current_size + line_length > chunk_size && !current.is_empty() {
            chunks.push(current.trim().to_string());
            current = line.to_string();
            current_size = line_length;
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            current_size += line_length;
        }
    }

    if !current.is_empty() {
        chunks.push(current.trim().to_string());
    }
    chunks
}
