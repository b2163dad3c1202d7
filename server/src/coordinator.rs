use crate::llm_client;
use crate::parser::parse_model_reply;
use crate::preview_client::PreviewFetcher;
use crate::prompt::{PromptBuilder, SYSTEM_PROMPT};
use crate::search_client::{SearchResult, WebSearchClient};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use watchbot_api::{ChatRequest, ChatResponse, Citation};
use watchbot_core::client::TextGenerator;
use watchbot_core::errors::GeminiError;
use watchbot_core::types::GenerationConfig;

const PROBE_PROMPT: &str = "Hello, can you respond with just \"API working\"?";

/// Failures that end a chat request without an answer
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Gemini API key not configured")]
    NotConfigured,

    #[error(transparent)]
    Generation(#[from] GeminiError),
}

/// Runs the optimize → search → generate → parse → enrich pipeline
#[derive(Clone)]
pub struct Coordinator {
    generator: Option<Arc<dyn TextGenerator>>,
    search: WebSearchClient,
    previews: PreviewFetcher,
    system_prompt: String,
}

impl Coordinator {
    /// `generator` is `None` when no generation credential is configured;
    /// every chat request then fails with [`ChatError::NotConfigured`].
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        search: WebSearchClient,
        previews: PreviewFetcher,
    ) -> Self {
        Self {
            generator,
            search,
            previews,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    fn generator(&self) -> Result<&dyn TextGenerator, ChatError> {
        self.generator.as_deref().ok_or(ChatError::NotConfigured)
    }

    /// Answers one chat message.
    #[instrument(
        skip_all,
        fields(
            request_id = %Uuid::new_v4(),
            history_len = request.conversation_history.len()
        )
    )]
    pub async fn process_chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let generator = self.generator()?;

        let builder = PromptBuilder::new(&self.system_prompt)
            .with_history(&request.conversation_history);

        let search_query =
            llm_client::optimize_query(generator, &request.message, &current_date()).await;
        let results = self.search.search(&search_query).await;

        let prompt = builder
            .with_search_results(&results)
            .finish(&request.message);

        let raw = llm_client::generate_response(generator, &prompt).await?;
        let (message, citations) = parse_model_reply(&raw).into_parts();

        let citations = restrict_to_offered(citations.unwrap_or_default(), &results);
        let citations = if citations.is_empty() {
            None
        } else {
            Some(self.previews.enrich(citations).await)
        };

        info!(
            response_len = message.len(),
            citations = citations.as_ref().map_or(0, Vec::len),
            "Chat request completed"
        );
        Ok(ChatResponse {
            response: message,
            citations,
        })
    }

    /// Checks that the generation provider answers at all.
    pub async fn probe(&self) -> Result<String, ChatError> {
        let generator = self.generator()?;
        let text = generator
            .generate(PROBE_PROMPT, GenerationConfig::default())
            .await?;
        Ok(text.trim().to_string())
    }
}

/// Today's date as shown to the query optimizer, e.g. "October 19, 2026".
pub fn current_date() -> String {
    chrono::Local::now().format("%B %-d, %Y").to_string()
}

fn normalize_link(link: &str) -> &str {
    link.trim().trim_end_matches('/')
}

/// Keeps only citations pointing at an organic result offered this turn.
///
/// Matching ignores surrounding whitespace and a trailing slash; kept
/// citations carry the offered link verbatim and appear once per link.
/// Any image the model attached is discarded; only the preview lookup sets one.
pub fn restrict_to_offered(citations: Vec<Citation>, offered: &[SearchResult]) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(citations.len());

    for mut citation in citations {
        let matched = offered
            .iter()
            .filter(|r| !r.is_overview())
            .find(|r| normalize_link(&r.link) == normalize_link(&citation.url));

        match matched {
            Some(result) => {
                if seen.insert(result.link.clone()) {
                    citation.url = result.link.clone();
                    citation.image_url = None;
                    kept.push(citation);
                }
            }
            None => {
                warn!(url = %citation.url, "Dropping citation not present in search results");
            }
        }
    }

    debug!(kept = kept.len(), "Citations restricted to offered results");
    kept
}
