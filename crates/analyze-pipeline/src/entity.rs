//! Best-entity (ticker) extraction strategies.

use async_trait::async_trait;
use finder_core::{FinderResult, SearchResultItem, TextCompletion};
use regex::Regex;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

static DOLLAR_TICKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[A-Za-z0-9]+").expect("valid ticker regex"));

const TICKER_SYSTEM_PROMPT: &str = "You are a financial assistant that finds the best-matching ticker symbol \
for a user's natural language query. The user provides a prompt and a list of social posts (casts). \
Pick the ticker symbol from the casts that is most relevant to the prompt. \
If none is clearly relevant, return the closest one you can find. Reply with the ticker only.";

/// Picks the best-matching short token from search results.
#[async_trait]
pub trait EntityStrategy: Send + Sync {
    async fn extract(&self, items: &[SearchResultItem], prompt: &str) -> FinderResult<Option<String>>;

    fn name(&self) -> &'static str;
}

/// First `$TOKEN` occurrence across items, in result order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DollarTickerStrategy;

impl DollarTickerStrategy {
    pub fn first_ticker(items: &[SearchResultItem]) -> Option<String> {
        items
            .iter()
            .find_map(|item| DOLLAR_TICKER_RE.find(&item.text))
            .map(|m| m.as_str().to_string())
    }
}

#[async_trait]
impl EntityStrategy for DollarTickerStrategy {
    async fn extract(&self, items: &[SearchResultItem], _prompt: &str) -> FinderResult<Option<String>> {
        Ok(Self::first_ticker(items))
    }

    fn name(&self) -> &'static str {
        "dollar"
    }
}

/// Asks the text-completion collaborator to choose the ticker.
#[derive(Clone)]
pub struct CompletionTickerStrategy {
    completion: Arc<dyn TextCompletion>,
}

impl CompletionTickerStrategy {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl EntityStrategy for CompletionTickerStrategy {
    async fn extract(&self, items: &[SearchResultItem], prompt: &str) -> FinderResult<Option<String>> {
        let texts: Vec<&str> = items
            .iter()
            .map(|item| item.text.as_str())
            .filter(|text| !text.is_empty())
            .collect();
        if texts.is_empty() {
            return Ok(None);
        }

        let user_message = format!(
            "Prompt: {}\n\nHere are the casts:\n{}\n\nPlease provide the best-matching ticker symbol",
            prompt,
            texts.join(", ")
        );

        let reply = self
            .completion
            .complete(TICKER_SYSTEM_PROMPT, &user_message)
            .await?;
        let ticker = reply.trim();

        tracing::info!("Model determined best-matching ticker: {}", ticker);
        Ok((!ticker.is_empty()).then(|| ticker.to_string()))
    }

    fn name(&self) -> &'static str {
        "completion"
    }
}

/// Configured choice between the two strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerStrategyKind {
    Dollar,
    Completion,
}

impl FromStr for TickerStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dollar" | "regex" => Ok(TickerStrategyKind::Dollar),
            "completion" | "gpt" | "llm" => Ok(TickerStrategyKind::Completion),
            other => Err(format!("unknown ticker strategy '{}' (expected dollar or completion)", other)),
        }
    }
}

impl TickerStrategyKind {
    pub fn build(self, completion: Arc<dyn TextCompletion>) -> Arc<dyn EntityStrategy> {
        match self {
            TickerStrategyKind::Dollar => Arc::new(DollarTickerStrategy),
            TickerStrategyKind::Completion => Arc::new(CompletionTickerStrategy::new(completion)),
        }
    }
}
