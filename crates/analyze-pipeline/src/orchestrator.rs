use chrono::Utc;
use finder_core::{CastSearch, FinderResult, QueryParams, SearchQuery, SearchResultItem};
use std::sync::Arc;

use crate::entity::EntityStrategy;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Runs translated queries against the search collaborator and ranks the results.
#[derive(Clone)]
pub struct SearchOrchestrator {
    search: Arc<dyn CastSearch>,
    strategy: Arc<dyn EntityStrategy>,
}

impl SearchOrchestrator {
    pub fn new(search: Arc<dyn CastSearch>, strategy: Arc<dyn EntityStrategy>) -> Self {
        Self { search, strategy }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub async fn search(&self, params: &QueryParams) -> FinderResult<Vec<SearchResultItem>> {
        let query = SearchQuery::from(params);
        let items = self.search.search(&query).await?;
        tracing::info!("Search for '{}' returned {} casts", query.text, items.len());
        Ok(items)
    }

    pub async fn extract_best_entity(
        &self,
        items: &[SearchResultItem],
        prompt: &str,
    ) -> FinderResult<Option<String>> {
        self.strategy.extract(items, prompt).await
    }
}

/// Keep items published within `max_age_days`, newest first. `None` is the identity.
pub fn filter_and_sort_by_age(items: Vec<SearchResultItem>, max_age_days: Option<u32>) -> Vec<SearchResultItem> {
    filter_and_sort_by_age_at(items, max_age_days, Utc::now().timestamp_millis())
}

/// Same as [`filter_and_sort_by_age`] with an explicit clock (epoch ms).
pub fn filter_and_sort_by_age_at(
    items: Vec<SearchResultItem>,
    max_age_days: Option<u32>,
    now_millis: i64,
) -> Vec<SearchResultItem> {
    let Some(days) = max_age_days else {
        return items;
    };

    let cutoff = now_millis.saturating_sub(i64::from(days).saturating_mul(MILLIS_PER_DAY));
    let mut kept: Vec<SearchResultItem> = items
        .into_iter()
        .filter(|item| item.published_at >= cutoff)
        .collect();

    // stable: equal timestamps keep their relative order
    kept.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    kept
}
