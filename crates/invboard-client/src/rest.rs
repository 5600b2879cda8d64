//! HTTP adapter for a PuppetDB-compatible backend.
//!
//! Every call is a single `GET` against the backend's JSON API. Non-2xx
//! responses become [`BackendError::Http`], blank bodies become
//! [`BackendError::EmptyResponse`].

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{Backend, BackendError, BackendResult, Page};

const VERSION_PATH: &str = "pdb/meta/v1/version";
const ENVIRONMENTS_PATH: &str = "pdb/query/v4/environments";
const QUERY_PATH: &str = "pdb/query/v4";

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Base URL, e.g. `http://puppetdb:8080`.
    pub url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
}

#[derive(Deserialize)]
struct VersionBody {
    version: String,
}

#[derive(Deserialize)]
struct EnvironmentBody {
    name: String,
}

impl HttpBackend {
    pub fn new(config: &HttpBackendConfig) -> BackendResult<Self> {
        let mut raw = config.url.trim_end_matches('/').to_string();
        raw.push('/');
        let base = Url::parse(&raw)
            .map_err(|e| BackendError::Other(format!("invalid backend url {:?}: {e}", config.url)))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("invboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::Other(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, base })
    }

    /// Base URL every endpoint path is joined onto.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> BackendResult<Url> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| BackendError::Other(format!("invalid endpoint {path:?}: {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    async fn get_json<T>(&self, path: &str, params: &[(&str, String)]) -> BackendResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(path, params)?;
        debug!(%url, "backend request");

        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            debug!(%status, %url, "backend returned non-2xx");
            return Err(BackendError::Http {
                status,
                url: url.to_string(),
            });
        }

        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Err(BackendError::EmptyResponse(format!("no content from {url}")));
        }

        serde_json::from_str(&body)
            .map_err(|e| BackendError::Other(format!("invalid JSON from {url}: {e}")))
    }
}

impl Backend for HttpBackend {
    async fn current_version(&self) -> BackendResult<String> {
        let body: VersionBody = self.get_json(VERSION_PATH, &[]).await?;
        Ok(body.version)
    }

    async fn environments(&self) -> BackendResult<Vec<String>> {
        let body: Vec<EnvironmentBody> = self.get_json(ENVIRONMENTS_PATH, &[]).await?;
        Ok(body.into_iter().map(|e| e.name).collect())
    }

    async fn query(&self, query: &str, page: Option<Page>) -> BackendResult<Vec<Value>> {
        let mut params = vec![("query", query.to_string())];
        if let Some(page) = page {
            params.push(("limit", page.limit.to_string()));
            params.push(("offset", page.offset.to_string()));
        }
        self.get_json(QUERY_PATH, &params).await
    }
}
