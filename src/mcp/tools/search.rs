//! Web search and page fetch tools.

use std::time::Duration;

use scraper::{Html, Selector};
use serde_json::{Value, json};
use tracing::debug;

use super::{http_url, non_blank};
use crate::config::BRAVE_API_KEY;
use crate::dispatch::{Arguments, ParamSpec, ToolDescriptor, ToolError, ToolOutcome, ToolSet};
use crate::upstream::SearchBackend;

/// Elements whose text never counts as page content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "header", "head", "noscript"];

pub struct SearchTools<B: SearchBackend> {
    backend: B,
    api_key: Option<String>,
    timeout: Duration,
    descriptors: Vec<ToolDescriptor>,
}

impl<B: SearchBackend> SearchTools<B> {
    /// Create the search tool set.
    ///
    /// # Arguments
    /// * `backend` - search and page fetch backend
    /// * `api_key` - Brave key; only `web_search` needs it
    /// * `timeout` - per-call limit
    ///
    /// # Returns
    /// A tool set exposing `web_search` and `web_fetch`.
    pub fn new(backend: B, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            backend,
            api_key,
            timeout,
            descriptors: descriptors(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn web_search(&self, args: &Arguments) -> ToolOutcome<Value> {
        let query = non_blank(args, "query")?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ToolError::configuration_missing(&[BRAVE_API_KEY]))?;
        let count = args.int("count").unwrap_or(10);
        let offset = args.int("offset").unwrap_or(0);

        let hits = self.backend.search(api_key, query, count, offset).await?;
        debug!(results = hits.len(), "search returned");

        Ok(json!({
            "query": query,
            "total_results": hits.len(),
            "results": hits,
        }))
    }

    async fn web_fetch(&self, args: &Arguments) -> ToolOutcome<Value> {
        let url = http_url(args, "url")?;

        let page = self.backend.fetch(url.as_str()).await?;
        let text = extract_page(&page.body);

        let mut payload = json!({
            "url": url.as_str(),
            "status": page.status,
            "title": text.title,
            "meta_description": text.meta_description,
            "content_length": text.content.chars().count(),
            "content": text.content,
        });
        if args.bool_or("include_html", false) {
            payload["html"] = Value::String(page.body);
        }
        Ok(payload)
    }
}

impl<B: SearchBackend> ToolSet for SearchTools<B> {
    fn server_name(&self) -> &'static str {
        "search"
    }

    fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call(&self, tool: &'static str, args: Arguments) -> ToolOutcome<Value> {
        match tool {
            "web_search" => self.web_search(&args).await,
            "web_fetch" => self.web_fetch(&args).await,
            other => Err(ToolError::unknown_tool(other)),
        }
    }
}

fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "web_search",
            "Search the web using Brave Search. Returns titles, URLs and descriptions in ranking order.",
        )
        .param(ParamSpec::string("query").required().describe("Search query"))
        .param(
            ParamSpec::integer("count")
                .default_int(10)
                .clamp(Some(1.0), Some(20.0))
                .describe("Number of results (1-20, default: 10)"),
        )
        .param(
            ParamSpec::integer("offset")
                .default_int(0)
                .reject_outside(Some(0.0), Some(9.0))
                .describe("Result page offset (0-9, default: 0)"),
        ),
        ToolDescriptor::new(
            "web_fetch",
            "Fetch a web page and extract its title, meta description and readable text.",
        )
        .param(ParamSpec::string("url").required().describe("http or https URL to fetch"))
        .param(
            ParamSpec::boolean("include_html")
                .default_bool(false)
                .describe("Also return the raw HTML"),
        ),
    ]
}

/// Readable parts of an HTML document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageText {
    pub title: String,
    pub meta_description: String,
    pub content: String,
}

/// Pull the title, meta description and visible text out of `html`.
///
/// Text inside [`SKIPPED_ELEMENTS`] is dropped; the rest is trimmed line by
/// line with blank lines removed.
pub fn extract_page(html: &str) -> PageText {
    let document = Html::parse_document(html);

    let title = selector("title")
        .and_then(|sel| document.select(&sel).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let meta_description = selector(r#"meta[name="description"]"#)
        .and_then(|sel| document.select(&sel).next())
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let mut lines = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        lines.extend(
            text.lines()
                .map(str::trim)
                .filter(|chunk| !chunk.is_empty())
                .map(str::to_string),
        );
    }

    PageText {
        title,
        meta_description,
        content: lines.join("\n"),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}
