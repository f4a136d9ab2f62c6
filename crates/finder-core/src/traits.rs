use async_trait::async_trait;

use crate::{FinderError, SearchQuery, SearchResultItem};

/// Black-box text completion: a system instruction plus a user message in, free text out.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, FinderError>;

    fn backend_name(&self) -> &'static str;
}

/// Cast search collaborator
#[async_trait]
pub trait CastSearch: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>, FinderError>;
}
