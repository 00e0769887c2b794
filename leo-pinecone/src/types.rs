//! Wire types of the Pinecone data plane (`/vectors/*`, `/query`) and
//! control plane (`/indexes`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Serialize)]
pub struct Vector {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct UpsertRequest<'a> {
    pub vectors: &'a [Vector],
    pub namespace: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest<'a> {
    pub vector: &'a [f32],
    pub top_k: usize,
    pub include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
pub struct Match {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct DeleteRequest<'a> {
    pub ids: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexStats {
    pub dimension: Option<usize>,
}

/// An index as listed or described by the control plane.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct IndexModel {
    pub name: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default)]
    pub metric: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IndexList {
    #[serde(default)]
    pub indexes: Vec<IndexModel>,
}

/// Body of `POST /indexes`. Only serverless indexes are created.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CreateIndexRequest {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    pub spec: Value,
}

impl CreateIndexRequest {
    /// Cosine index on AWS serverless in `region`.
    pub fn serverless(name: impl Into<String>, dimension: usize, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: "cosine".to_string(),
            spec: serde_json::json!({
                "serverless": { "cloud": "aws", "region": region.into() }
            }),
        }
    }
}
