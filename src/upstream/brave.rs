//! Brave Search API client and plain page fetching.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::http::{HttpError, build_client, check_status, json_body};

/// Browser-like agent; some sites refuse unknown clients.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub description: String,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

pub trait SearchBackend: Send + Sync {
    /// One page of web results, in upstream order.
    fn search(
        &self,
        api_key: &str,
        query: &str,
        count: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<SearchHit>, HttpError>> + Send;

    /// GET a page; non-2xx statuses are errors.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage, HttpError>> + Send;
}

#[derive(Debug, Clone)]
pub struct BraveClient {
    client: Client,
    base_url: String,
}

impl BraveClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, HttpError> {
        Ok(Self {
            client: build_client(timeout, USER_AGENT)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl SearchBackend for BraveClient {
    async fn search(
        &self,
        api_key: &str,
        query: &str,
        count: i64,
        offset: i64,
    ) -> Result<Vec<SearchHit>, HttpError> {
        let url = format!("{}/res/v1/web/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .query(&[
                ("q", query.to_string()),
                ("count", count.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;

        let data = json_body(response).await?;
        Ok(parse_results(&data))
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage, HttpError> {
        let response = check_status(self.client.get(url).send().await?).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchedPage { status, body })
    }
}

/// Extract `web.results`; a response without web results is an empty page.
pub fn parse_results(data: &Value) -> Vec<SearchHit> {
    let field = |item: &Value, key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    data.pointer("/web/results")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| SearchHit {
                    title: field(item, "title"),
                    url: field(item, "url"),
                    description: field(item, "description"),
                    age: field(item, "age"),
                })
                .collect()
        })
        .unwrap_or_default()
}
