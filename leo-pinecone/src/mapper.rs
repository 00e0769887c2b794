//! Conversion between [`Document`]s and Pinecone vector metadata.
//!
//! The chunk text travels inside the metadata under `text_key`; everything
//! else in [`Document::metadata`] rides along as filterable fields.

use std::collections::HashMap;

use leo_core::Document;
use serde_json::{Map, Value};

use crate::error::PineconeStoreError;

pub fn vector_metadata(doc: &Document, text_key: &str) -> Map<String, Value> {
    let mut metadata = Map::new();
    for (key, value) in &doc.metadata {
        // Pinecone only stores scalars and string lists
        let value = match value {
            Value::Null => continue,
            Value::Array(items) if items.iter().all(Value::is_string) => value.clone(),
            Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
            scalar => scalar.clone(),
        };
        metadata.insert(key.clone(), value);
    }
    metadata.insert(text_key.to_string(), Value::String(doc.content.clone()));
    metadata
}

pub fn document_from_match(
    id: &str,
    metadata: &Value,
    text_key: &str,
) -> Result<Document, PineconeStoreError> {
    let Value::Object(fields) = metadata else {
        return Err(PineconeStoreError::Malformed(format!(
            "metadata of match '{id}' is not an object"
        )));
    };
    let content = fields
        .get(text_key)
        .and_then(Value::as_str)
        .ok_or_else(|| PineconeStoreError::MissingTextKey {
            text_key: text_key.to_string(),
        })?;

    let metadata: HashMap<String, Value> = fields
        .iter()
        .filter(|(key, _)| key.as_str() != text_key)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Ok(Document {
        id: id.to_string(),
        content: content.to_string(),
        metadata,
        embedding: None,
    })
}
