use crate::errors::{ProviderError, ProviderResult};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use watchbot_api::Citation;
use watchbot_core::config::PreviewConfig;

/// Looks up the preview image advertised by a web page
#[async_trait]
pub trait PreviewProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` when the page has no preview image metadata.
    async fn preview_image(&self, url: &str) -> ProviderResult<Option<String>>;
}

/// Firecrawl v2 scrape backend
#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl FirecrawlClient {
    pub fn new(config: &PreviewConfig, client: Client) -> ProviderResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("missing FIRECRAWL_API_KEY".to_string()))?;
        Ok(Self {
            client,
            api_key,
            endpoint: config.endpoint().to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct FirecrawlScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<FirecrawlScrapeData>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlScrapeData {
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl FirecrawlScrapeData {
    fn preview_image(&self) -> Option<String> {
        ["ogImage", "og:image"].iter().find_map(|key| {
            match self.metadata.get(*key)? {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                // Some pages declare several og:image tags.
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .find(|s| !s.trim().is_empty())
                    .map(|s| s.trim().to_string()),
                _ => None,
            }
        })
    }
}

#[async_trait]
impl PreviewProvider for FirecrawlClient {
    fn name(&self) -> &'static str {
        "firecrawl"
    }

    async fn preview_image(&self, url: &str) -> ProviderResult<Option<String>> {
        let body = serde_json::json!({ "url": url });

        let resp = self
            .client
            .post(&self.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let parsed: FirecrawlScrapeResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        if !parsed.success {
            return Err(ProviderError::Parse(
                "firecrawl scrape returned success=false".to_string(),
            ));
        }

        Ok(parsed.data.and_then(|d| d.preview_image()))
    }
}

/// Best-effort preview image lookup for citations
#[derive(Clone)]
pub struct PreviewFetcher {
    provider: Option<Arc<dyn PreviewProvider>>,
}

impl PreviewFetcher {
    pub fn new(provider: Arc<dyn PreviewProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// A fetcher that never finds an image.
    pub fn disabled() -> Self {
        Self { provider: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn fetch_preview_image(&self, url: &str) -> Option<String> {
        let provider = self.provider.as_ref()?;

        match provider.preview_image(url).await {
            Ok(image) => {
                debug!(url, found = image.is_some(), "Preview lookup finished");
                image
            }
            Err(e) => {
                warn!(url, provider = provider.name(), error = %e, "Preview lookup failed");
                None
            }
        }
    }

    /// Looks up every citation's image concurrently and waits for all of them.
    pub async fn enrich(&self, citations: Vec<Citation>) -> Vec<Citation> {
        if !self.is_enabled() {
            debug!("Preview API key not configured, skipping image enrichment");
            return citations;
        }

        join_all(citations.into_iter().map(|mut citation| async move {
            citation.image_url = self.fetch_preview_image(&citation.url).await;
            citation
        }))
        .await
    }
}
