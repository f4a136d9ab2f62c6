pub mod chat;
pub mod error;
pub mod provider;

pub use chat::CompletionClient;
pub use error::{CompletionError, CompletionResult};

use finder_core::RetryPolicy;
use std::time::Duration;

/// Configuration for the chat-completions backend
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}
