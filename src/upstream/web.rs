//! Generic HTTP requests for the web API tools.
//!
//! Unlike the REST clients, any status is a successful exchange here: the
//! caller gets the status, headers and body back as they arrived.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::future::Future;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response};
use serde_json::Value;

use super::http::{HttpError, build_client};

const USER_AGENT: &str = concat!("toolbelt/", env!("CARGO_PKG_VERSION"));

/// Body bytes read before the rest of a response is dropped.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    /// Repeated headers are joined with `", "`.
    pub headers: BTreeMap<String, String>,
    pub body: String,
    /// The body went past [`MAX_BODY_BYTES`] and was cut.
    pub truncated: bool,
}

pub trait HttpApi: Send + Sync {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, HttpError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    client: Client,
}

impl ReqwestApi {
    /// Create a client for arbitrary HTTP requests.
    ///
    /// # Arguments
    /// * `timeout` - per-request timeout, body included
    ///
    /// # Returns
    /// The client, or `HttpError::Client` if TLS setup fails.
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        Ok(Self {
            client: build_client(timeout, USER_AGENT)?,
        })
    }
}

impl HttpApi for ReqwestApi {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, HttpError> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = flatten_headers(response.headers());
        let (body, truncated) = read_capped(response, MAX_BODY_BYTES).await?;

        Ok(ApiResponse {
            status,
            headers,
            body,
            truncated,
        })
    }
}

fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        match flat.entry(name.as_str().to_string()) {
            Entry::Occupied(mut entry) => {
                let joined = entry.get_mut();
                joined.push_str(", ");
                joined.push_str(&value);
            }
            Entry::Vacant(slot) => {
                slot.insert(value.into_owned());
            }
        }
    }
    flat
}

async fn read_capped(mut response: Response, limit: usize) -> Result<(String, bool), HttpError> {
    let mut bytes = Vec::new();
    let mut truncated = false;
    while let Some(chunk) = response.chunk().await? {
        let room = limit - bytes.len();
        if chunk.len() > room {
            bytes.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok((String::from_utf8_lossy(&bytes).into_owned(), truncated))
}
