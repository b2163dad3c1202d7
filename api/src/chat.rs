use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One prior message in the client-held conversation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    /// True when the user wrote this turn, false for assistant replies
    pub is_user: bool,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            is_user: true,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            is_user: false,
            content: content.into(),
        }
    }
}

/// A source the assistant cited, optionally with a preview image
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Body of `POST /chat`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
}

/// Reasons a chat request body is rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("Message is required and must be a string")]
    InvalidMessage,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, conversation_history: Vec<ConversationTurn>) -> Self {
        Self {
            message: message.into(),
            conversation_history,
        }
    }

    /// Validates a raw request body.
    ///
    /// The message must be a non-blank string. A history that is not an array
    /// is ignored, and malformed turns inside it are skipped.
    pub fn parse(body: &[u8]) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| RequestError::InvalidMessage)?;
        let object = value.as_object().ok_or(RequestError::InvalidMessage)?;

        let message = match object.get("message") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            _ => return Err(RequestError::InvalidMessage),
        };

        let conversation_history = match object.get("conversationHistory") {
            Some(Value::Array(turns)) => turns
                .iter()
                .filter_map(|turn| serde_json::from_value(turn.clone()).ok())
                .collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            message,
            conversation_history,
        })
    }
}

/// Successful `POST /chat` reply
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

/// Body of every non-2xx reply
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Reply of the generation connectivity probe
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    pub success: bool,
    pub response: String,
}
