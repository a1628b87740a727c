//! Raw HTTP request tools.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::http_url;
use crate::dispatch::{Arguments, ParamSpec, ToolDescriptor, ToolError, ToolOutcome, ToolSet};
use crate::upstream::{ApiRequest, HttpApi, RequestBody};

/// Body characters returned to the caller.
pub const MAX_BODY_CHARS: usize = 99_000;
const TRUNCATED_MARKER: &str = "\n\n[TRUNCATED]";

pub struct WebApiTools<A: HttpApi> {
    api: A,
    timeout: Duration,
    descriptors: Vec<ToolDescriptor>,
}

impl<A: HttpApi> WebApiTools<A> {
    /// Create the web API tool set.
    ///
    /// # Arguments
    /// * `api` - sends the requests
    /// * `timeout` - per-call limit
    ///
    /// # Returns
    /// A tool set exposing `http_get`, `http_post`, `http_put`,
    /// `http_delete` and `http_patch`.
    pub fn new(api: A, timeout: Duration) -> Self {
        Self {
            api,
            timeout,
            descriptors: descriptors(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    async fn request(&self, method: Method, args: &Arguments) -> ToolOutcome<Value> {
        let url = http_url(args, "url")?;
        let request = ApiRequest {
            headers: header_pairs(args.object("headers"))?,
            query: string_pairs("params", args.object("params"))?,
            body: request_body(&method, args)?,
            url: url.to_string(),
            method,
        };

        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.api.send(&request).await?;

        let (body, cut) = truncate_body(&response.body);
        Ok(json!({
            "url": request.url,
            "method": request.method.as_str(),
            "status": response.status,
            "headers": response.headers,
            "body": body,
            "truncated": cut || response.truncated,
        }))
    }
}

impl<A: HttpApi> ToolSet for WebApiTools<A> {
    fn server_name(&self) -> &'static str {
        "web_api"
    }

    fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call(&self, tool: &'static str, args: Arguments) -> ToolOutcome<Value> {
        let method = match tool {
            "http_get" => Method::GET,
            "http_post" => Method::POST,
            "http_put" => Method::PUT,
            "http_delete" => Method::DELETE,
            "http_patch" => Method::PATCH,
            other => return Err(ToolError::unknown_tool(other)),
        };
        self.request(method, &args).await
    }
}

/// JSON wins over form data; PUT and PATCH always carry a JSON body.
fn request_body(method: &Method, args: &Arguments) -> ToolOutcome<RequestBody> {
    match (args.object("json_data"), args.object("form_data")) {
        (Some(_), Some(_)) => Err(ToolError::invalid_parameter(
            "form_data",
            "cannot be combined with json_data",
        )),
        (Some(data), None) => Ok(RequestBody::Json(Value::Object(data.clone()))),
        (None, Some(form)) => Ok(RequestBody::Form(string_pairs("form_data", Some(form))?)),
        (None, None) if *method == Method::PUT || *method == Method::PATCH => {
            Ok(RequestBody::Json(json!({})))
        }
        (None, None) => Ok(RequestBody::Empty),
    }
}

/// Flatten an object of scalars into ordered name/value pairs.
fn string_pairs(name: &str, object: Option<&Map<String, Value>>) -> ToolOutcome<Vec<(String, String)>> {
    let Some(object) = object else {
        return Ok(Vec::new());
    };
    object
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(ToolError::invalid_parameter(
                        name,
                        format!("value for '{key}' must be a string, number or boolean"),
                    ));
                }
            };
            Ok((key.clone(), text))
        })
        .collect()
}

fn header_pairs(object: Option<&Map<String, Value>>) -> ToolOutcome<Vec<(String, String)>> {
    let pairs = string_pairs("headers", object)?;
    for (name, value) in &pairs {
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ToolError::invalid_parameter("headers", format!("'{name}' is not a valid header name"))
        })?;
        HeaderValue::from_str(value).map_err(|_| {
            ToolError::invalid_parameter("headers", format!("value for '{name}' is not a valid header value"))
        })?;
    }
    Ok(pairs)
}

pub fn truncate_body(body: &str) -> (String, bool) {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((idx, _)) => (format!("{}{TRUNCATED_MARKER}", &body[..idx]), true),
        None => (body.to_string(), false),
    }
}

fn url() -> ParamSpec {
    ParamSpec::string("url").required().describe("URL to request (http or https)")
}

fn headers() -> ParamSpec {
    ParamSpec::object("headers").describe("Optional HTTP headers")
}

fn json_data() -> ParamSpec {
    ParamSpec::object("json_data").describe("JSON body to send")
}

fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("http_get", "Make an HTTP GET request.")
            .param(url())
            .param(headers())
            .param(ParamSpec::object("params").describe("Optional query parameters")),
        ToolDescriptor::new("http_post", "Make an HTTP POST request.")
            .param(url())
            .param(headers())
            .param(json_data())
            .param(ParamSpec::object("form_data").describe("Form fields to send instead of JSON")),
        ToolDescriptor::new("http_put", "Make an HTTP PUT request.")
            .param(url())
            .param(headers())
            .param(json_data()),
        ToolDescriptor::new("http_delete", "Make an HTTP DELETE request.")
            .param(url())
            .param(headers()),
        ToolDescriptor::new("http_patch", "Make an HTTP PATCH request.")
            .param(url())
            .param(headers())
            .param(json_data()),
    ]
}
