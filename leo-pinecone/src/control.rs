//! Index management against the Pinecone control plane.

use tracing::Instrument;

use crate::client::PineconeHttpClient;
use crate::types::{CreateIndexRequest, IndexList, IndexModel};
use crate::PineconeStoreError;

pub const DEFAULT_CONTROL_URL: &str = "https://api.pinecone.io";

#[derive(Clone, Debug)]
pub struct PineconeControlPlane {
    client: PineconeHttpClient,
}

impl PineconeControlPlane {
    pub fn new(api_key: impl Into<String>) -> Result<Self, PineconeStoreError> {
        Self::with_base_url(api_key, DEFAULT_CONTROL_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, PineconeStoreError> {
        Ok(Self {
            client: PineconeHttpClient::new(base_url, api_key)?,
        })
    }

    pub async fn list_indexes(&self) -> Result<Vec<IndexModel>, PineconeStoreError> {
        let list: IndexList = self.client.get("/indexes").await?;
        Ok(list.indexes)
    }

    pub async fn describe_index(&self, name: &str) -> Result<IndexModel, PineconeStoreError> {
        self.client.get(&format!("/indexes/{name}")).await
    }

    /// Creates the index; an index that already exists is not an error.
    pub async fn create_index(&self, request: &CreateIndexRequest) -> Result<(), PineconeStoreError> {
        let span = tracing::info_span!("pinecone_create_index", index_name = %request.name);
        match self
            .client
            .post::<_, serde_json::Value>("/indexes", request, None)
            .instrument(span)
            .await
        {
            Ok(_) => {
                tracing::info!(index_name = %request.name, "created pinecone index");
                Ok(())
            }
            Err(err) if err.is_already_exists() => {
                tracing::warn!(
                    index_name = %request.name,
                    "pinecone index already exists, proceeding with existing index"
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(index_name = %request.name, error = %err, "failed to create pinecone index");
                Err(err)
            }
        }
    }

    /// Creates `request.name` when missing and returns its data-plane URL.
    pub async fn ensure_index(
        &self,
        request: &CreateIndexRequest,
    ) -> Result<String, PineconeStoreError> {
        let existing = self.list_indexes().await?;
        if !existing.iter().any(|index| index.name == request.name) {
            tracing::info!(index_name = %request.name, "creating pinecone index");
            self.create_index(request).await?;
        }

        let index = self.describe_index(&request.name).await?;
        let host = index.host.filter(|host| !host.is_empty()).ok_or_else(|| {
            PineconeStoreError::Malformed(format!("index '{}' has no host yet", request.name))
        })?;
        tracing::info!(index_name = %request.name, host = %host, "pinecone index initialized");

        if host.starts_with("http://") || host.starts_with("https://") {
            Ok(host)
        } else {
            Ok(format!("https://{host}"))
        }
    }
}
