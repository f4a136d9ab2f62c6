use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownEngagement;

/// Social interaction metric a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engagement {
    Reactions,
    Recasts,
    Replies,
    Watches,
}

impl Engagement {
    pub const ALL: [Engagement; 4] = [
        Engagement::Reactions,
        Engagement::Recasts,
        Engagement::Replies,
        Engagement::Watches,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Engagement::Reactions => "reactions",
            Engagement::Recasts => "recasts",
            Engagement::Replies => "replies",
            Engagement::Watches => "watches",
        }
    }
}

impl fmt::Display for Engagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engagement {
    type Err = UnknownEngagement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Engagement::ALL
            .into_iter()
            .find(|e| e.as_str() == normalized)
            .ok_or_else(|| UnknownEngagement(s.to_string()))
    }
}

/// Structured search parameters produced from a natural-language prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pub text: String,
    pub engagement: Engagement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_limit_days: Option<u32>,
}

/// Query string sent to the cast search service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    pub text: String,
    pub count: Option<u32>,
    pub engagement: Option<Engagement>,
    pub username: Option<String>,
    pub page: Option<u32>,
}

impl SearchQuery {
    /// Flatten into `(name, value)` pairs, skipping absent fields.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("text", self.text.clone())];
        if let Some(count) = self.count {
            pairs.push(("count", count.to_string()));
        }
        if let Some(engagement) = self.engagement {
            pairs.push(("engagement", engagement.to_string()));
        }
        if let Some(username) = &self.username {
            pairs.push(("username", username.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        pairs
    }
}

impl From<&QueryParams> for SearchQuery {
    fn from(params: &QueryParams) -> Self {
        Self {
            text: params.text.clone(),
            count: params.count,
            engagement: Some(params.engagement),
            username: params.username.clone(),
            page: None,
        }
    }
}

/// One cast returned by the search service, flattened for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub post_id: String,
    pub text: String,
    pub username: String,
    pub display_name: String,
    pub reactions: u64,
    pub recasts: u64,
    pub replies: u64,
    pub watches: u64,
    #[serde(default)]
    pub tags: Vec<serde_json::Value>,
    #[serde(default)]
    pub mentions: Vec<serde_json::Value>,
    /// Epoch milliseconds
    pub published_at: i64,
}

/// Last-used query parameters for a wallet. One row per wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequestRecord {
    pub wallet_address: String,
    pub count: Option<i64>,
    pub text: String,
    pub engagement: Engagement,
    pub prompt: String,
}

impl AnalyzeRequestRecord {
    pub fn from_query(wallet_address: &str, params: &QueryParams, prompt: &str) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
            count: params.count.map(i64::from),
            text: params.text.clone(),
            engagement: params.engagement,
            prompt: prompt.to_string(),
        }
    }

    /// Rebuild search parameters for replay. Stored counts outside `1..=u32::MAX` are dropped.
    pub fn query_params(&self) -> QueryParams {
        QueryParams {
            text: self.text.clone(),
            engagement: self.engagement,
            count: self
                .count
                .and_then(|c| u32::try_from(c).ok())
                .filter(|c| *c > 0),
            username: None,
            age_limit_days: None,
        }
    }
}

/// Partial update of a stored record. `None` leaves a column untouched;
/// `count: Some(None)` clears the stored count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    pub count: Option<Option<i64>>,
    pub text: Option<String>,
    pub engagement: Option<Engagement>,
    pub prompt: Option<String>,
}

impl RecordUpdate {
    /// Overwrite every query column with freshly translated parameters.
    pub fn from_query(params: &QueryParams, prompt: &str) -> Self {
        Self {
            count: Some(params.count.map(i64::from)),
            text: Some(params.text.clone()),
            engagement: Some(params.engagement),
            prompt: Some(prompt.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count.is_none() && self.text.is_none() && self.engagement.is_none() && self.prompt.is_none()
    }
}
