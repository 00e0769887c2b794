//! Authenticated JSON transport shared by the data plane and the control plane.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::PineconeStoreError;

pub const API_VERSION: &str = "2024-07";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct PineconeHttpClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl PineconeHttpClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, PineconeStoreError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PineconeStoreError::Config("PINECONE_API_KEY is empty".to_string()));
        }
        let base_url = base_url.into().trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|err| {
            PineconeStoreError::Config(format!("invalid pinecone url '{base_url}': {err}"))
        })?;

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| PineconeStoreError::Config(err.to_string()))?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    /// POSTs `body` to `path`. `namespace` is only used to label errors.
    pub async fn post<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
        namespace: Option<&str>,
    ) -> Result<Resp, PineconeStoreError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "pinecone POST");
        let builder = self.request(self.http.post(url)).json(body);
        self.execute(builder, namespace).await
    }

    pub async fn get<Resp>(&self, path: &str) -> Result<Resp, PineconeStoreError>
    where
        Resp: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "pinecone GET");
        self.execute(self.request(self.http.get(url)), None).await
    }

    async fn execute<Resp>(
        &self,
        builder: RequestBuilder,
        namespace: Option<&str>,
    ) -> Result<Resp, PineconeStoreError>
    where
        Resp: DeserializeOwned,
    {
        let response = builder
            .send()
            .await
            .map_err(|err| PineconeStoreError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(api_error(response, namespace).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| PineconeStoreError::Transport(err.to_string()))?;
        // upsert and delete may answer 200 with no body
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(Value::Object(Default::default()))
                .map_err(|err| PineconeStoreError::Malformed(err.to_string()));
        }
        serde_json::from_slice(&bytes).map_err(|err| PineconeStoreError::Malformed(err.to_string()))
    }
}

async fn api_error(response: Response, namespace: Option<&str>) -> PineconeStoreError {
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    let message = ["/message", "/error/message", "/error"]
        .iter()
        .find_map(|pointer| body.pointer(pointer).and_then(Value::as_str))
        .unwrap_or("no error message")
        .to_string();
    let code = body
        .pointer("/error/code")
        .and_then(Value::as_str)
        .map(str::to_string);
    tracing::warn!(status, %message, ?code, ?namespace, "pinecone request rejected");

    PineconeStoreError::Api {
        status,
        message,
        code,
        namespace: namespace.map(str::to_string),
    }
}
