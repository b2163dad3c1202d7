use crate::prompt::optimization_prompt;
use tracing::{debug, info, warn};
use watchbot_core::client::TextGenerator;
use watchbot_core::errors::GeminiResult;
use watchbot_core::types::GenerationConfig;

/// Sends the assembled prompt to the model and returns its raw text.
pub async fn generate_response(generator: &dyn TextGenerator, prompt: &str) -> GeminiResult<String> {
    info!(
        model = generator.model_name(),
        prompt_len = prompt.len(),
        "Requesting answer from model"
    );
    let text = generator.generate(prompt, GenerationConfig::answer()).await?;
    debug!(response_len = text.len(), "Model answered");
    Ok(text)
}

/// Rewrites `user_query` into a search-engine query.
///
/// Falls back to the original query on any failure or empty output.
pub async fn optimize_query(
    generator: &dyn TextGenerator,
    user_query: &str,
    current_date: &str,
) -> String {
    let prompt = optimization_prompt(user_query, current_date);

    match generator
        .generate(&prompt, GenerationConfig::query_rewrite())
        .await
    {
        Ok(text) => {
            let optimized = clean_query(&text);
            if optimized.is_empty() {
                warn!("Query optimizer returned empty output, using original query");
                return user_query.to_string();
            }
            info!(optimized_query = %optimized, "Optimized search query");
            optimized
        }
        Err(e) => {
            warn!(error = %e, "Error optimizing query, using original query");
            user_query.to_string()
        }
    }
}

fn clean_query(text: &str) -> String {
    let trimmed = text.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}
