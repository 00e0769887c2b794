use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::{tempdir, NamedTempFile};
use zip::write::FileOptions;

use leo_retrieval::{load_file_async, load_files_async, IngestionError, TextLoader};

fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(suffix).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn write_docx(path: &Path, body: &str) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("[Content_Types].xml", FileOptions::default()).unwrap();
    zip.write_all(b"<?xml version=\"1.0\"?><Types/>").unwrap();
    zip.start_file("word/document.xml", FileOptions::default()).unwrap();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

#[tokio::test]
async fn text_file_loads_with_source_and_type() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "Photosynthesis turns light into sugar.").unwrap();

    let documents = load_file_async(path.clone()).await.unwrap();

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].id, path.to_string_lossy());
    assert_eq!(documents[0].content, "Photosynthesis turns light into sugar.");
    assert_eq!(
        documents[0].metadata.get("source"),
        Some(&Value::String(path.to_string_lossy().into_owned()))
    );
    assert_eq!(
        documents[0].metadata.get("file_type"),
        Some(&Value::String("text/plain".to_string()))
    );
}

#[tokio::test]
async fn unknown_extension_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("blob.xyz");
    fs::write(&path, "???").unwrap();

    let error = load_file_async(path.clone()).await.unwrap_err();
    assert!(matches!(
        error,
        IngestionError::UnsupportedExtension { path: error_path, extension }
            if error_path == path && extension == "xyz"
    ));
}

#[tokio::test]
async fn missing_file_is_a_read_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gone.md");
    let error = load_file_async(path.clone()).await.unwrap_err();
    assert!(matches!(error, IngestionError::Read { path: error_path, .. } if error_path == path));
}

#[test]
fn sync_text_loader_reads_file() {
    let file = write_temp(".txt", "sync content");
    let docs = TextLoader::new(PathBuf::from(file.path())).load().unwrap();
    assert_eq!(docs[0].content, "sync content");
}

#[tokio::test]
async fn html_loader_keeps_visible_text_and_page_metadata() {
    let file = write_temp(
        ".html",
        r#"<!DOCTYPE html>
<html lang="fr">
<head><title>Cellules</title><style>body { color: red; }</style></head>
<body>
  <header>Site header</header>
  <nav>Menu</nav>
  <h1>La cellule</h1>
  <p>Unité de base du <strong>vivant</strong>.</p>
  <script>console.log("x")</script>
  <footer>Copyright</footer>
</body>
</html>"#,
    );

    let documents = load_file_async(PathBuf::from(file.path())).await.unwrap();
    let doc = &documents[0];

    assert!(doc.content.contains("La cellule"));
    assert!(doc.content.contains("Unité de base du vivant"));
    for hidden in ["Site header", "Menu", "color: red", "console.log", "Copyright"] {
        assert!(!doc.content.contains(hidden), "{hidden} should be stripped");
    }
    assert_eq!(doc.metadata.get("title").and_then(Value::as_str), Some("Cellules"));
    assert_eq!(doc.metadata.get("lang").and_then(Value::as_str), Some("fr"));
}

#[tokio::test]
async fn html_loader_recovers_from_malformed_markup() {
    let file = write_temp(
        ".htm",
        "<html><body><h1>Unclosed heading<p>Para with <b>bold<ul><li>one<li>two</div><p>After</body>",
    );
    let documents = load_file_async(PathBuf::from(file.path())).await.unwrap();
    let content = &documents[0].content;
    for expected in ["Unclosed heading", "Para with", "bold", "one", "two", "After"] {
        assert!(content.contains(expected), "missing {expected}");
    }
}

#[tokio::test]
async fn markdown_loader_records_headers() {
    let file = write_temp(
        ".md",
        "# Top Level\n\nIntro with **bold**.\n\n## Second Level\n\n* Item 1\n* Item 2\n\n```rust\nfn main() {}\n```\n\n### Third Level\n\nEnd.\n",
    );

    let documents = load_file_async(PathBuf::from(file.path())).await.unwrap();
    let doc = &documents[0];

    for expected in ["Top Level", "Intro with bold", "Item 2", "fn main", "End."] {
        assert!(doc.content.contains(expected), "missing {expected}");
    }
    assert_eq!(doc.metadata.get("title").and_then(Value::as_str), Some("Top Level"));

    let headers = doc.metadata.get("headers").and_then(Value::as_array).unwrap();
    let levels: Vec<u64> = headers
        .iter()
        .filter_map(|h| h.get("level").and_then(Value::as_u64))
        .collect();
    assert_eq!(levels, vec![1, 2, 3]);
    assert_eq!(headers[1].get("text").and_then(Value::as_str), Some("Second Level"));
}

#[tokio::test]
async fn docx_loader_flattens_paragraphs_and_table_cells() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lesson.docx");
    write_docx(
        &path,
        "<w:p><w:r><w:t>Intro paragraph</w:t></w:r></w:p>\
         <w:p><w:r><w:t xml:space=\"preserve\">Second </w:t></w:r><w:r><w:t>paragraph &amp; more</w:t></w:r></w:p>\
         <w:tbl>\
           <w:tr><w:tc><w:p><w:r><w:t>R1C1</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>R1C2</w:t></w:r></w:p></w:tc></w:tr>\
           <w:tr><w:tc><w:p><w:r><w:t>R2C1</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>R2C2</w:t></w:r></w:p></w:tc></w:tr>\
         </w:tbl>",
    );

    let documents = load_file_async(path.clone()).await.unwrap();

    assert_eq!(documents.len(), 1);
    assert_eq!(
        documents[0].content,
        "Intro paragraph\n\nSecond paragraph & more\n\nR1C1 | R1C2\nR2C1 | R2C2"
    );
}

#[tokio::test]
async fn malformed_docx_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.docx");
    fs::write(&path, b"PK\x03\x04 not really a zip").unwrap();

    let error = load_file_async(path.clone()).await.unwrap_err();
    assert!(matches!(error, IngestionError::Parse { path: err_path, .. } if err_path == path));
}

#[tokio::test]
async fn load_files_concatenates_results() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.json");
    fs::write(&a, "alpha").unwrap();
    fs::write(&b, r#"[{"q": "2+2"}, "four"]"#).unwrap();

    let documents = load_files_async(vec![a, b]).await.unwrap();
    assert_eq!(documents.len(), 3);
    assert_eq!(documents[2].content, "four");
}

#[tokio::test]
#[cfg(feature = "pdf")]
async fn pdf_extension_routes_to_pdf_loader() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.pdf");
    let error = load_file_async(path.clone()).await.unwrap_err();
    assert!(!matches!(error, IngestionError::UnsupportedExtension { .. }));
}
