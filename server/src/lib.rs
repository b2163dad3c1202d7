//! watchbot daemon library: the chat orchestration pipeline and its HTTP surface.

pub mod coordinator;
pub mod errors;
pub mod http_server;
pub mod llm_client;
pub mod parser;
pub mod preview_client;
pub mod prompt;
pub mod search_client;

pub use coordinator::{ChatError, Coordinator};
pub use http_server::{router, run_server, AppState};
