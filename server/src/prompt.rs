//! Prompt text for the chat assistant and the search-query optimizer.

use crate::search_client::SearchResult;
use watchbot_api::ConversationTurn;

/// Only this many of the most recent turns are replayed to the model.
pub const MAX_HISTORY_TURNS: usize = 10;

pub const SYSTEM_PROMPT: &str = r#"You're a friendly Apple Watch expert who loves helping people get the most out of their watch! Think of yourself as that tech-savvy friend who's always excited to share Apple Watch tips and tricks.

Your conversation style:
- Keep responses concise and conversational (2-4 sentences for simple questions, more only when truly needed)
- Be warm, enthusiastic, and supportive
- Use casual language while staying knowledgeable
- Remember what we've talked about in our conversation
- Ask follow-up questions to keep the conversation flowing
- Share practical tips from real-world usage

When helping:
- Jump straight to the answer without unnecessary preamble
- Use everyday language instead of technical jargon
- Mention specific models (Series 10, Ultra 2, SE) naturally when relevant
- For troubleshooting, start with the simplest solution
- If something's not Apple Watch related, gently steer back with humor

IMPORTANT - Response Format:
You MUST respond with valid JSON in this exact format:
{
  "message": "your conversational response here",
  "citations": [
    {
      "title": "Source Title",
      "url": "https://example.com",
      "description": "Brief description"
    }
  ]
}

Citation Guidelines:
- ALWAYS review the web search results provided in the context and include relevant citations in your response
- Include citations for factual information such as features, specifications, comparisons, troubleshooting, tips, updates, how-to guides, pricing, availability and technical details
- Select 2-4 of the most relevant sources from the search results that support your answer
- Use the exact title and URL of the search result, and a relevant snippet as the description
- Only cite URLs that appear in the search results
- Skip citations for simple greetings, pure opinion questions, or when no search results are available; use an empty array: "citations": []

Be yourself - helpful, friendly, and genuinely excited about Apple Watch!"#;

/// Instruction prompt asking the model to rewrite `user_query` for a search engine.
pub fn optimization_prompt(user_query: &str, current_date: &str) -> String {
    format!(
        r#"You are a search query optimizer for Apple Watch related questions.

Today's date is {current_date}.

User question: "{user_query}"

Generate an optimized search query that will find the most relevant, current information about Apple Watch.
- Keep product model names and numbers exactly as the user wrote them (for example "Series 10" or "Ultra 2"), even if you do not recognize them. Never assume a model does not exist.
- Prefer recent information: when the question is about new releases, updates or pricing, include the current year.
- Focus on key terms, features, models, and technical details.
- Make the query concise but comprehensive for web search.

Respond with only the optimized search query text, nothing else."#
    )
}

/// The tail of `history` that fits in the replay window, in original order.
pub fn recent_history(history: &[ConversationTurn]) -> &[ConversationTurn] {
    let start = history.len().saturating_sub(MAX_HISTORY_TURNS);
    &history[start..]
}

/// Incrementally assembles the single-turn prompt sent to the generator.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    text: String,
}

impl PromptBuilder {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            text: format!("{}\n\n", system_prompt),
        }
    }

    pub fn with_history(mut self, history: &[ConversationTurn]) -> Self {
        let recent = recent_history(history);
        if recent.is_empty() {
            return self;
        }

        self.text.push_str("Recent conversation:\n");
        for turn in recent {
            let speaker = if turn.is_user { "User" } else { "You" };
            self.text.push_str(&format!("{}: {}\n", speaker, turn.content));
        }
        self.text.push('\n');
        self
    }

    pub fn with_search_results(mut self, results: &[SearchResult]) -> Self {
        if results.is_empty() {
            return self;
        }

        self.text.push_str("=== WEB SEARCH RESULTS ===\n");
        for (i, result) in results.iter().enumerate() {
            self.text.push_str(&format!("[{}] {}\n", i + 1, result.title));
            self.text.push_str(&format!("URL: {}\n", result.link));
            self.text.push_str(&format!("Snippet: {}\n", result.snippet));
            if let Some(date) = &result.date {
                self.text.push_str(&format!("Date: {}\n", date));
            }
            self.text.push('\n');
        }
        self.text.push_str("=== END OF WEB SEARCH RESULTS ===\n\n");
        self
    }

    /// Appends the user's message and the continuation cue.
    pub fn finish(mut self, user_message: &str) -> String {
        self.text.push_str(&format!("User: {}\n\nYou:", user_message));
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(position: u32, title: &str, link: &str, date: Option<&str>) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            link: link.to_string(),
            snippet: format!("about {}", title),
            position,
            date: date.map(str::to_string),
            source: None,
        }
    }

    #[test]
    fn test_history_window_keeps_last_ten_in_order() {
        let history: Vec<ConversationTurn> = (0..15)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationTurn::user(format!("turn {}", i))
                } else {
                    ConversationTurn::assistant(format!("turn {}", i))
                }
            })
            .collect();

        let recent = recent_history(&history);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.first().unwrap().content, "turn 5");
        assert_eq!(recent.last().unwrap().content, "turn 14");

        let prompt = PromptBuilder::new("SYS").with_history(&history).finish("now");
        for i in 0..5 {
            assert!(!prompt.contains(&format!("turn {}\n", i)));
        }
        let positions: Vec<usize> = (5..15)
            .map(|i| prompt.find(&format!(": turn {}\n", i)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(prompt.contains("You: turn 5\n"));
        assert!(prompt.contains("User: turn 6\n"));
    }

    #[test]
    fn test_prompt_without_history_or_results() {
        let prompt = PromptBuilder::new("SYS")
            .with_history(&[])
            .with_search_results(&[])
            .finish("hello");
        assert_eq!(prompt, "SYS\n\nUser: hello\n\nYou:");
    }

    #[test]
    fn test_search_block_is_numbered_and_precedes_message() {
        let results = vec![
            result(0, "AI Overview", "#", None),
            result(1, "Battery life", "https://support.apple.com/battery", Some("Sep 9, 2026")),
        ];
        let prompt = PromptBuilder::new("SYS")
            .with_history(&[ConversationTurn::user("hi")])
            .with_search_results(&results)
            .finish("How's the battery?");

        assert!(prompt.contains("Recent conversation:\nUser: hi\n\n"));
        assert!(prompt.contains("[1] AI Overview\nURL: #\n"));
        assert!(prompt.contains(
            "[2] Battery life\nURL: https://support.apple.com/battery\nSnippet: about Battery life\nDate: Sep 9, 2026\n"
        ));
        let block_end = prompt.find("=== END OF WEB SEARCH RESULTS ===").unwrap();
        let message = prompt.find("User: How's the battery?").unwrap();
        assert!(block_end < message);
        assert!(prompt.ends_with("User: How's the battery?\n\nYou:"));
    }

    #[test]
    fn test_optimization_prompt_mentions_date_and_query() {
        let prompt = optimization_prompt("Series 11 battery?", "October 19, 2026");
        assert!(prompt.contains("Today's date is October 19, 2026."));
        assert!(prompt.contains("User question: \"Series 11 battery?\""));
        assert!(prompt.contains("Never assume a model does not exist"));
    }
}
