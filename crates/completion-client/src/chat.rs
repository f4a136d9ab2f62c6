use serde::{Deserialize, Serialize};

use crate::error::{CompletionError, CompletionResult};
use crate::CompletionConfig;

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, if the model produced one.
    pub(crate) fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
    }
}

/// OpenAI-compatible chat completions client
#[derive(Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> CompletionResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Single system + user exchange; returns the raw reply text.
    pub async fn chat(&self, system: &str, user: &str) -> CompletionResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(CompletionError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .send_request(self.client.post(&url).bearer_auth(api_key).json(&request))
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::ServiceUnavailable { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed.first_content().ok_or_else(|| {
            CompletionError::InvalidResponse("completion response has no message content".to_string())
        })?;

        tracing::debug!(model = %self.config.model, chars = content.len(), "Completion received");
        Ok(content)
    }

    /// Send with the configured timeout, retrying transport errors, 429 and 5xx.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> CompletionResult<reqwest::Response> {
        let request = builder.build()?;
        let policy = self.config.retry;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let req_clone = request.try_clone().ok_or_else(|| {
                CompletionError::InvalidResponse("cannot clone completion request".to_string())
            })?;

            match self.client.execute(req_clone).await {
                Ok(response)
                    if finder_core::RetryPolicy::is_retryable_status(response.status().as_u16())
                        && policy.has_attempts_left(attempt) =>
                {
                    tracing::warn!(
                        "Completion API returned {}, retrying {}/{}",
                        response.status(),
                        attempt,
                        policy.max_attempts
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if policy.has_attempts_left(attempt) => {
                    tracing::warn!(
                        "Completion request failed ({}), retrying {}/{}",
                        e,
                        attempt,
                        policy.max_attempts
                    );
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }
}
