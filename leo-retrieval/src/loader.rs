//! Document loaders for uploaded and on-disk files.

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use leo_core::{Document, Value};
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;

use crate::html::html_to_text;
use crate::IngestionError;

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Pdf,
    Docx,
    Markdown,
    Html,
    Csv,
    Json,
}

impl FileKind {
    pub fn mime(&self) -> &'static str {
        match self {
            FileKind::Text => "text/plain",
            FileKind::Pdf => "application/pdf",
            FileKind::Docx => DOCX_MIME,
            FileKind::Markdown => "text/markdown",
            FileKind::Html => "text/html",
            FileKind::Csv => "text/csv",
            FileKind::Json => "application/json",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let kind = match mime {
            "text/plain" => FileKind::Text,
            "application/pdf" => FileKind::Pdf,
            DOCX_MIME => FileKind::Docx,
            "text/markdown" | "text/x-markdown" => FileKind::Markdown,
            "text/html" => FileKind::Html,
            "text/csv" => FileKind::Csv,
            "application/json" => FileKind::Json,
            _ => return None,
        };
        Some(kind)
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        let kind = match extension.to_ascii_lowercase().as_str() {
            "txt" | "text" | "log" => FileKind::Text,
            "pdf" => FileKind::Pdf,
            "docx" | "doc" => FileKind::Docx,
            "md" | "markdown" => FileKind::Markdown,
            "html" | "htm" => FileKind::Html,
            "csv" => FileKind::Csv,
            "json" => FileKind::Json,
            _ => return None,
        };
        Some(kind)
    }
}

/// Recognizes formats with an unambiguous signature. Plain text yields `None`
/// so the file name can decide between text, Markdown and CSV.
pub fn sniff(bytes: &[u8]) -> Option<FileKind> {
    if bytes.starts_with(b"%PDF-") {
        return Some(FileKind::Pdf);
    }
    if bytes.starts_with(b"PK\x03\x04") {
        let head = &bytes[..bytes.len().min(4096)];
        if head.windows(5).any(|window| window == b"word/") {
            return Some(FileKind::Docx);
        }
        return None;
    }

    let text = std::str::from_utf8(&bytes[..bytes.len().min(1024)]).ok()?;
    let lowered = text.trim_start().to_ascii_lowercase();
    if lowered.starts_with("<!doctype html") || lowered.starts_with("<html") {
        return Some(FileKind::Html);
    }
    if (lowered.starts_with('{') || lowered.starts_with('['))
        && serde_json::from_slice::<serde_json::Value>(bytes).is_ok()
    {
        return Some(FileKind::Json);
    }
    None
}

/// Content sniffing first, then the MIME type guessed from `filename`, then
/// its extension.
pub fn detect(filename: &str, bytes: &[u8]) -> Option<FileKind> {
    if let Some(kind) = sniff(bytes) {
        return Some(kind);
    }
    if let Some(kind) = mime_guess::from_path(filename)
        .first_raw()
        .and_then(FileKind::from_mime)
    {
        return Some(kind);
    }
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(FileKind::from_extension)
}

fn base_metadata(source: &str) -> HashMap<String, Value> {
    let mut metadata = HashMap::new();
    metadata.insert("source".to_string(), Value::String(source.to_string()));
    metadata
}

fn single(source: &str, content: String, extra: HashMap<String, Value>) -> Vec<Document> {
    let mut metadata = base_metadata(source);
    metadata.extend(extra);
    vec![Document {
        id: source.to_string(),
        content,
        metadata,
        embedding: None,
    }]
}

/// Parses `bytes` as `kind`. `source` becomes the document id and `source` metadata.
pub fn load_bytes(kind: FileKind, bytes: &[u8], source: &str) -> Result<Vec<Document>, IngestionError> {
    match kind {
        FileKind::Text => {
            let content = String::from_utf8(bytes.to_vec())
                .map_err(|err| IngestionError::parse(source, err))?;
            Ok(single(source, content, HashMap::new()))
        }
        FileKind::Pdf => load_pdf(bytes, source),
        FileKind::Docx => Ok(single(source, docx_text(bytes, source)?, HashMap::new())),
        FileKind::Markdown => {
            let text = std::str::from_utf8(bytes).map_err(|err| IngestionError::parse(source, err))?;
            let markdown = markdown_text(text);
            let mut extra = HashMap::new();
            if let Some(title) = markdown.title() {
                extra.insert("title".to_string(), Value::String(title.to_string()));
            }
            let headers: Vec<Value> = markdown
                .headings
                .iter()
                .map(|(level, text)| serde_json::json!({ "level": level, "text": text }))
                .collect();
            extra.insert("headers".to_string(), Value::Array(headers));
            Ok(single(source, markdown.text, extra))
        }
        FileKind::Html => {
            let page = html_to_text(&String::from_utf8_lossy(bytes));
            let mut extra = HashMap::new();
            if let Some(title) = page.title {
                extra.insert("title".to_string(), Value::String(title));
            }
            if let Some(lang) = page.lang {
                extra.insert("lang".to_string(), Value::String(lang));
            }
            Ok(single(source, page.text, extra))
        }
        FileKind::Csv => {
            let text = std::str::from_utf8(bytes).map_err(|err| IngestionError::parse(source, err))?;
            Ok(csv_documents(text, source))
        }
        FileKind::Json => {
            let value: serde_json::Value =
                serde_json::from_slice(bytes).map_err(|err| IngestionError::parse(source, err))?;
            Ok(json_documents(value, source))
        }
    }
}

#[cfg(feature = "pdf")]
fn load_pdf(bytes: &[u8], source: &str) -> Result<Vec<Document>, IngestionError> {
    let content =
        pdf_extract::extract_text_from_mem(bytes).map_err(|err| IngestionError::parse(source, err))?;
    Ok(single(source, content, HashMap::new()))
}

#[cfg(not(feature = "pdf"))]
fn load_pdf(_bytes: &[u8], source: &str) -> Result<Vec<Document>, IngestionError> {
    Err(IngestionError::parse(source, "pdf feature disabled"))
}

struct MarkdownText {
    text: String,
    headings: Vec<(usize, String)>,
}

impl MarkdownText {
    fn title(&self) -> Option<&str> {
        self.headings
            .iter()
            .find(|(level, _)| *level == 1)
            .map(|(_, text)| text.as_str())
    }
}

fn markdown_text(markdown: &str) -> MarkdownText {
    let mut out = String::new();
    let mut headings = Vec::new();
    let mut heading: Option<(HeadingLevel, String)> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => heading = Some((level, String::new())),
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, text)) = heading.take() {
                    headings.push((level as usize, text.trim().to_string()));
                }
                out.push_str("\n\n");
            }
            Event::End(TagEnd::Paragraph | TagEnd::Item | TagEnd::CodeBlock) => {
                out.push_str("\n\n");
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, heading_text)) = heading.as_mut() {
                    heading_text.push_str(&text);
                }
                out.push_str(&text);
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            _ => {}
        }
    }
    MarkdownText {
        text: out.trim().to_string(),
        headings,
    }
}

/// Paragraphs separated by blank lines; table rows as `cell | cell`.
fn docx_text(bytes: &[u8], source: &str) -> Result<String, IngestionError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|err| IngestionError::parse(source, err))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|err| IngestionError::parse(source, err))?
        .read_to_string(&mut xml)
        .map_err(|err| IngestionError::parse(source, err))?;

    let mut reader = Reader::from_str(&xml);
    let mut blocks: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut in_text = false;
    let mut table_depth = 0usize;
    let mut rows: Vec<String> = Vec::new();
    let mut cells: Vec<String> = Vec::new();
    let mut cell = String::new();

    loop {
        match reader.read_event() {
            Ok(XmlEvent::Start(e)) => match e.local_name().as_ref() {
                b"p" => paragraph.clear(),
                b"t" => in_text = true,
                b"tbl" => table_depth += 1,
                b"tr" => cells.clear(),
                b"tc" => cell.clear(),
                _ => {}
            },
            Ok(XmlEvent::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => paragraph.push('\t'),
                b"br" => paragraph.push('\n'),
                _ => {}
            },
            Ok(XmlEvent::Text(e)) if in_text => paragraph.push_str(&String::from_utf8_lossy(&e)),
            Ok(XmlEvent::GeneralRef(e)) if in_text => {
                if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(&e)) {
                    paragraph.push_str(&resolved);
                }
            }
            Ok(XmlEvent::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = paragraph.trim().to_string();
                    if table_depth > 0 {
                        if !text.is_empty() {
                            if !cell.is_empty() {
                                cell.push(' ');
                            }
                            cell.push_str(&text);
                        }
                    } else if !text.is_empty() {
                        blocks.push(text);
                    }
                }
                b"tc" => cells.push(cell.clone()),
                b"tr" => rows.push(cells.join(" | ")),
                b"tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 && !rows.is_empty() {
                        blocks.push(rows.join("\n"));
                        rows.clear();
                    }
                }
                _ => {}
            },
            Ok(XmlEvent::Eof) => break,
            Err(err) => return Err(IngestionError::parse(source, err)),
            _ => {}
        }
    }

    Ok(blocks.join("\n\n"))
}

fn resolve_entity(name: &str) -> Option<String> {
    let resolved = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)?
        }
    };
    Some(resolved.to_string())
}

/// One document per row, each line `column: value`.
fn csv_documents(text: &str, source: &str) -> Vec<Document> {
    let mut records = parse_csv(text).into_iter();
    let Some(headers) = records.next() else {
        return Vec::new();
    };

    records
        .enumerate()
        .map(|(row, record)| {
            let content = headers
                .iter()
                .zip(record.iter().chain(std::iter::repeat(&String::new())))
                .map(|(header, value)| format!("{}: {}", header.trim(), value.trim()))
                .collect::<Vec<_>>()
                .join("\n");
            let mut metadata = base_metadata(source);
            metadata.insert("row".to_string(), Value::from(row));
            Document {
                id: format!("{source}:{row}"),
                content,
                metadata,
                embedding: None,
            }
        })
        .collect()
}

fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => record.push(std::mem::take(&mut field)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut field));
                if record.iter().any(|value| !value.is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            other => field.push(other),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

/// Arrays become one document per element, anything else a single document.
fn json_documents(value: serde_json::Value, source: &str) -> Vec<Document> {
    fn render(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::String(text) => text.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }

    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(seq, item)| {
                let mut metadata = base_metadata(source);
                metadata.insert("seq_num".to_string(), Value::from(seq + 1));
                Document {
                    id: format!("{source}:{seq}"),
                    content: render(item),
                    metadata,
                    embedding: None,
                }
            })
            .collect(),
        other => single(source, render(&other), HashMap::new()),
    }
}

pub struct TextLoader {
    path: PathBuf,
}

impl TextLoader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<Vec<Document>, IngestionError> {
        let content = fs::read_to_string(&self.path).map_err(|source| IngestionError::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(single(&self.path.to_string_lossy(), content, HashMap::new()))
    }
}

/// Loads a file by its extension. Unknown extensions are an error.
pub async fn load_file_async(path: PathBuf) -> Result<Vec<Document>, IngestionError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_string();
    let kind = FileKind::from_extension(&extension).ok_or_else(|| {
        IngestionError::UnsupportedExtension {
            path: path.clone(),
            extension: extension.clone(),
        }
    })?;

    let bytes = tokio::fs::read(&path).await.map_err(|source| IngestionError::Read {
        path: path.clone(),
        source,
    })?;

    let source = path.to_string_lossy().into_owned();
    let mut documents = tokio::task::spawn_blocking(move || load_bytes(kind, &bytes, &source))
        .await
        .map_err(|err| IngestionError::parse(path.clone(), err))??;

    for doc in &mut documents {
        doc.metadata
            .insert("file_type".to_string(), Value::String(kind.mime().to_string()));
    }
    Ok(documents)
}

pub async fn load_files_async(paths: Vec<PathBuf>) -> Result<Vec<Document>, IngestionError> {
    let mut documents = Vec::new();
    for path in paths {
        documents.extend(load_file_async(path).await?);
    }
    Ok(documents)
}
