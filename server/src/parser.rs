//! Decoding of the model's structured reply.
//!
//! The model is asked to answer with `{"message": ..., "citations": [...]}`,
//! often wrapped in a fenced code block. Anything that does not decode into
//! that shape is passed through untouched as plain text.

use serde_json::Value;
use tracing::debug;
use watchbot_api::Citation;

/// Outcome of decoding raw model text
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    /// The model followed the JSON contract.
    Structured {
        message: String,
        citations: Option<Vec<Citation>>,
    },
    /// Raw text, verbatim.
    PlainText(String),
}

impl ParsedReply {
    pub fn into_parts(self) -> (String, Option<Vec<Citation>>) {
        match self {
            Self::Structured { message, citations } => (message, citations),
            Self::PlainText(text) => (text, None),
        }
    }
}

/// Removes every ```` ``` ```` fence marker (with or without a language tag).
fn strip_code_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(idx) = rest.find("```") {
        out.push_str(&rest[..idx]);
        let mut after = &rest[idx + 3..];
        if let Some(tail) = after.strip_prefix("json") {
            after = tail;
        }
        rest = after.trim_start();
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Parses the raw model text into a reply, never failing.
pub fn parse_model_reply(raw: &str) -> ParsedReply {
    let cleaned = strip_code_fences(raw);

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "JSON parse failed, using plain text response");
            return ParsedReply::PlainText(raw.to_string());
        }
    };

    let Some(message) = value.get("message").and_then(Value::as_str) else {
        debug!("Reply has no string message field, using plain text response");
        return ParsedReply::PlainText(raw.to_string());
    };

    let citations = value
        .get("citations")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value::<Citation>(entry.clone()).ok())
                .collect()
        });

    ParsedReply::Structured {
        message: message.to_string(),
        citations,
    }
}
