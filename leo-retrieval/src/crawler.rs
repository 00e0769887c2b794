use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use leo_core::{cache_key, ttl, CacheManager};
use reqwest::Client;
use serde_json::json;
use url::Url;

use crate::html::same_host_links;
use crate::IngestionError;

pub const DEFAULT_MAX_DEPTH: usize = 2;
pub const DEFAULT_MAX_PAGES: usize = 50;
pub(crate) const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn http_client() -> Result<Client, IngestionError> {
    Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|err| IngestionError::Fetch {
            url: String::new(),
            message: err.to_string(),
        })
}

/// GETs `url` once, following redirects.
pub(crate) async fn try_fetch(client: &Client, url: &str) -> Result<String, IngestionError> {
    let failure = |err: reqwest::Error| {
        let transient = err.is_timeout()
            || err.is_connect()
            || err
                .status()
                .is_some_and(|status| status.as_u16() == 429 || status.is_server_error());
        let (url, message) = (url.to_string(), err.to_string());
        if transient {
            IngestionError::Unavailable { url, message }
        } else {
            IngestionError::Fetch { url, message }
        }
    };
    let response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(failure)?;
    response.text().await.map_err(failure)
}

/// Like [`try_fetch`], but failures are logged and yield `None`.
pub(crate) async fn fetch_html(client: &Client, url: &str) -> Option<String> {
    match try_fetch(client, url).await {
        Ok(body) => Some(body),
        Err(err) => {
            tracing::error!(url, error = %err, "fetch failed");
            None
        }
    }
}

/// Breadth-first crawl of one site.
#[derive(Clone)]
pub struct SimpleCrawler {
    client: Client,
    max_depth: usize,
    max_pages: usize,
    cache: Option<Arc<CacheManager>>,
}

impl SimpleCrawler {
    pub fn new(max_depth: usize, max_pages: usize) -> Result<Self, IngestionError> {
        Ok(Self {
            client: http_client()?,
            max_depth,
            max_pages,
            cache: None,
        })
    }

    pub fn with_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// URLs reachable from `start_url` on the same host, at most `max_pages`
    /// of them. A page that fails to load is still listed.
    pub async fn crawl(&self, start_url: &str) -> Result<Vec<String>, IngestionError> {
        let start = Url::parse(start_url).map_err(|source| IngestionError::InvalidUrl {
            url: start_url.to_string(),
            source,
        })?;

        let key = cache_key(
            "crawled_urls",
            &json!({ "start_url": start_url, "max_depth": self.max_depth, "max_pages": self.max_pages }),
        );
        if let Some(cache) = &self.cache {
            if let Some(urls) = cache.get_as::<Vec<String>>(&key) {
                tracing::info!(start_url, count = urls.len(), "using cached crawl");
                return Ok(urls);
            }
        }

        tracing::info!(
            start_url,
            max_depth = self.max_depth,
            max_pages = self.max_pages,
            "starting crawl"
        );
        let mut queue = VecDeque::from([(start, 0usize)]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut found: Vec<String> = Vec::new();

        while found.len() < self.max_pages {
            let Some((url, depth)) = queue.pop_front() else {
                break;
            };
            if !visited.insert(url.to_string()) {
                continue;
            }
            found.push(url.to_string());
            tracing::info!(
                page = found.len(),
                max_pages = self.max_pages,
                depth,
                url = %url,
                "crawling"
            );

            let Some(html) = fetch_html(&self.client, url.as_str()).await else {
                continue;
            };
            if depth < self.max_depth {
                for link in same_host_links(&html, &url) {
                    if !visited.contains(link.as_str()) {
                        queue.push_back((link, depth + 1));
                    }
                }
            }
        }

        tracing::info!(count = found.len(), "finished crawling");
        if let Some(cache) = &self.cache {
            cache.set_as(key, &found, Some(ttl::CRAWLED_URLS));
        }
        Ok(found)
    }
}
