use async_trait::async_trait;
use finder_core::{FinderError, TextCompletion};

use crate::CompletionClient;

#[async_trait]
impl TextCompletion for CompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, FinderError> {
        Ok(self.chat(system, user).await?)
    }

    fn backend_name(&self) -> &'static str {
        "openai"
    }
}
