use crate::errors::{ProviderError, ProviderResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use watchbot_core::config::SearchConfig;

/// Link used by the synthetic AI-overview entry
pub const OVERVIEW_LINK: &str = "#";

/// One web search hit offered to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub position: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl SearchResult {
    pub fn is_overview(&self) -> bool {
        self.link == OVERVIEW_LINK
    }
}

/// A web search backend returning provider-ranked results
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// At most one overview entry plus `max_results` organic results.
    async fn search(&self, query: &str, max_results: usize) -> ProviderResult<Vec<SearchResult>>;
}

/// SearchAPI.io (Google engine) backend
#[derive(Debug, Clone)]
pub struct SearchApiProvider {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl SearchApiProvider {
    pub fn new(config: &SearchConfig, client: Client) -> ProviderResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("missing SEARCH_API_KEY".to_string()))?;
        Ok(Self {
            client,
            api_key,
            endpoint: config.endpoint().to_string(),
        })
    }
}

#[async_trait]
impl SearchProvider for SearchApiProvider {
    fn name(&self) -> &'static str {
        "searchapi"
    }

    async fn search(&self, query: &str, max_results: usize) -> ProviderResult<Vec<SearchResult>> {
        let t0 = Instant::now();
        let num = max_results.to_string();

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", num.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            // without_url keeps the api_key query parameter out of logs
            .map_err(|e| ProviderError::Request(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let parsed: SearchApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.without_url().to_string()))?;

        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            organic = parsed.organic_results.len(),
            "searchapi responded"
        );
        Ok(normalize_response(parsed, max_results))
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    ai_overview: Option<AiOverview>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    position: Option<u32>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AiOverview {
    #[serde(default)]
    text_blocks: Vec<TextBlock>,
}

#[derive(Debug, Deserialize)]
struct TextBlock {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    items: Vec<TextBlockItem>,
}

#[derive(Debug, Deserialize)]
struct TextBlockItem {
    #[serde(default)]
    answer: Option<String>,
}

/// Joins every available block answer, in block order, with newlines.
fn flatten_overview(overview: &AiOverview) -> String {
    overview
        .text_blocks
        .iter()
        .map(|block| match block.answer.as_deref() {
            Some(answer) if !answer.is_empty() => answer.to_string(),
            _ => block
                .items
                .iter()
                .filter_map(|item| item.answer.as_deref())
                .filter(|answer| !answer.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        })
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_response(response: SearchApiResponse, max_results: usize) -> Vec<SearchResult> {
    let mut results = Vec::with_capacity(max_results + 1);

    if let Some(overview) = &response.ai_overview {
        let text = flatten_overview(overview);
        if !text.is_empty() {
            results.push(SearchResult {
                title: "AI Overview".to_string(),
                link: OVERVIEW_LINK.to_string(),
                snippet: text,
                position: 0,
                date: None,
                source: None,
            });
        }
    }

    results.extend(
        response
            .organic_results
            .into_iter()
            .filter(|r| !r.link.is_empty())
            .take(max_results)
            .enumerate()
            .map(|(i, r)| SearchResult {
                title: r.title,
                link: r.link,
                snippet: r.snippet.unwrap_or_default(),
                position: r.position.unwrap_or(i as u32 + 1),
                date: r.date,
                source: r.source,
            }),
    );

    results
}

/// Best-effort web search: failures and missing configuration yield no results.
#[derive(Clone)]
pub struct WebSearchClient {
    provider: Option<Arc<dyn SearchProvider>>,
    results_count: usize,
}

impl WebSearchClient {
    pub fn new(provider: Arc<dyn SearchProvider>, results_count: usize) -> Self {
        Self {
            provider: Some(provider),
            results_count,
        }
    }

    /// A client that always returns no results.
    pub fn disabled() -> Self {
        Self {
            provider: None,
            results_count: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        let Some(provider) = &self.provider else {
            info!("Search API key not configured, skipping web search");
            return Vec::new();
        };

        info!(provider = provider.name(), query, "Searching the web");
        match provider.search(query, self.results_count).await {
            Ok(results) => {
                info!(
                    count = results.len(),
                    "Found search results (including AI overview if present)"
                );
                results
            }
            Err(e) => {
                warn!(error = %e, "Web search failed, continuing without results");
                Vec::new()
            }
        }
    }
}
