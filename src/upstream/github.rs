//! GitHub REST API client.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde_json::Value;

use super::http::{HttpError, build_client, json_body};

const USER_AGENT: &str = concat!("toolbelt/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// Query parameters for a GET.
pub type Query = [(&'static str, String)];

pub trait GitHubApi: Send + Sync {
    fn get(
        &self,
        token: &str,
        path: &str,
        query: &Query,
    ) -> impl Future<Output = Result<Value, HttpError>> + Send;

    fn post(
        &self,
        token: &str,
        path: &str,
        body: &Value,
    ) -> impl Future<Output = Result<Value, HttpError>> + Send;
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: Url,
}

impl GitHubClient {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://api.github.com`
    /// * `timeout` - per-request timeout
    ///
    /// # Returns
    /// The client, or `HttpError::Client` if the URL cannot carry a path.
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, HttpError> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| HttpError::Client(format!("invalid API URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(HttpError::Client(format!("invalid API URL: {base_url}")));
        }
        Ok(Self {
            client: build_client(timeout, USER_AGENT)?,
            base_url,
        })
    }

    /// Append `path` to the base URL one segment at a time, so `?`, `#`
    /// and `%` inside a segment are percent-encoded instead of read as
    /// URL syntax.
    fn url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url
    }

    fn authorize(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }
}

impl GitHubApi for GitHubClient {
    async fn get(&self, token: &str, path: &str, query: &Query) -> Result<Value, HttpError> {
        let request = self.authorize(self.client.get(self.url(path)), token).query(query);
        json_body(request.send().await?).await
    }

    async fn post(&self, token: &str, path: &str, body: &Value) -> Result<Value, HttpError> {
        let request = self.authorize(self.client.post(self.url(path)), token).json(body);
        json_body(request.send().await?).await
    }
}
