//! Pinecone vector store integration for Leo.
//!
//! This crate provides:
//! - a data-plane `PineconeVectorStore` with an injected embedding provider (`E: Embedding`),
//! - namespace-scoped `upsert_documents` / `similarity_search` with result caching,
//! - a control-plane client that lists, describes and creates serverless indexes.
//!
//! Environment variables read by the server:
//! - `PINECONE_API_KEY`
//! - `PINECONE_ENVIRONMENT` (serverless region)
//! - `PINECONE_INDEX`, `PINECONE_NAMESPACE`

pub mod client;
mod config;
pub mod control;
mod error;
pub mod mapper;
mod store;
mod types;

pub use config::PineconeStoreBuilder;
pub use control::{PineconeControlPlane, DEFAULT_CONTROL_URL};
pub use error::PineconeStoreError;
pub use store::{PineconeVectorStore, DEFAULT_UPSERT_BATCH};
pub use types::{CreateIndexRequest, IndexModel};
