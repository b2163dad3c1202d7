// HTTP contract shared by the watchbot daemon and its clients.

pub mod chat; // POST /chat request/response bodies

pub use chat::{
    ChatRequest, ChatResponse, Citation, ConversationTurn, ErrorResponse, ProbeResponse,
    RequestError,
};
