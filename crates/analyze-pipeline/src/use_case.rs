use finder_core::{
    AnalyzeRequestRecord, FinderError, FinderResult, QueryParams, RecordUpdate, SearchResultItem,
};
use request_store::{AnalyzeRequestStore, StoreError};
use serde::Serialize;

use crate::orchestrator::{filter_and_sort_by_age, SearchOrchestrator};
use crate::translator::PromptTranslator;

const ANALYZE_MESSAGE: &str = "Parameters parsed and data fetched successfully";

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub message: String,
    pub parameters: QueryParams,
    pub suggestion: Option<String>,
    pub first_ticker: Option<String>,
    pub results: Vec<SearchResultItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayResponse {
    pub status: String,
    pub parameters: QueryParams,
    pub first_ticker: Option<String>,
    pub results: Vec<SearchResultItem>,
}

/// End-to-end analyze flow: translate, persist, search, rank.
#[derive(Clone)]
pub struct AnalyzeUseCase {
    translator: PromptTranslator,
    store: AnalyzeRequestStore,
    orchestrator: SearchOrchestrator,
}

impl AnalyzeUseCase {
    pub fn new(translator: PromptTranslator, store: AnalyzeRequestStore, orchestrator: SearchOrchestrator) -> Self {
        Self {
            translator,
            store,
            orchestrator,
        }
    }

    pub fn store(&self) -> &AnalyzeRequestStore {
        &self.store
    }

    pub async fn analyze(&self, wallet_address: &str, prompt: &str) -> FinderResult<AnalyzeResponse> {
        let wallet_address = wallet_address.trim();
        if wallet_address.is_empty() {
            return Err(FinderError::BadRequest("wallet_address must not be empty".to_string()));
        }
        if prompt.trim().is_empty() {
            return Err(FinderError::BadRequest("query must not be empty".to_string()));
        }

        let translation = self.translator.translate(prompt).await?;
        let params = translation.params;

        // Persist before searching so a failed search can still be replayed.
        self.persist(wallet_address, &params, prompt).await?;

        let items = self.orchestrator.search(&params).await?;
        let first_ticker = self.orchestrator.extract_best_entity(&items, prompt).await?;
        let results = filter_and_sort_by_age(items, params.age_limit_days);

        tracing::info!(
            wallet = wallet_address,
            strategy = self.orchestrator.strategy_name(),
            "Analyze complete: {} results, ticker {:?}",
            results.len(),
            first_ticker
        );

        Ok(AnalyzeResponse {
            message: ANALYZE_MESSAGE.to_string(),
            parameters: params,
            suggestion: translation.suggestion,
            first_ticker,
            results,
        })
    }

    /// Re-run the stored query for a wallet without calling the translator.
    pub async fn replay(&self, wallet_address: &str) -> FinderResult<ReplayResponse> {
        let record = self
            .store
            .get_by_key(wallet_address)
            .await?
            .ok_or_else(|| FinderError::NotFound(format!("no stored request for wallet '{}'", wallet_address)))?;

        let params = record.query_params();
        let items = self.orchestrator.search(&params).await?;
        let first_ticker = self.orchestrator.extract_best_entity(&items, &record.prompt).await?;

        Ok(ReplayResponse {
            status: "success".to_string(),
            parameters: params,
            first_ticker,
            results: items,
        })
    }

    async fn persist(&self, wallet_address: &str, params: &QueryParams, prompt: &str) -> FinderResult<()> {
        if self.store.get_by_key(wallet_address).await?.is_some() {
            self.update_existing(wallet_address, params, prompt).await
        } else {
            self.insert_new(wallet_address, params, prompt).await
        }
    }

    /// Insert path; a concurrent writer that won the insert turns this into an update.
    async fn insert_new(&self, wallet_address: &str, params: &QueryParams, prompt: &str) -> FinderResult<()> {
        let record = AnalyzeRequestRecord::from_query(wallet_address, params, prompt);
        match self.store.insert(&record).await {
            Ok(_) => {
                tracing::info!("Stored new analyze request for {}", wallet_address);
                Ok(())
            }
            Err(StoreError::DuplicateKey(_)) => {
                tracing::warn!("Concurrent insert for {}; overwriting", wallet_address);
                self.update_existing(wallet_address, params, prompt).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_existing(&self, wallet_address: &str, params: &QueryParams, prompt: &str) -> FinderResult<()> {
        let updated = self
            .store
            .update(wallet_address, RecordUpdate::from_query(params, prompt))
            .await?;

        match updated {
            Some(_) => {
                tracing::info!("Updated analyze request for {}", wallet_address);
                Ok(())
            }
            // deleted between the read and the write
            None => {
                tracing::warn!("Analyze request for {} vanished before update; re-creating", wallet_address);
                let record = AnalyzeRequestRecord::from_query(wallet_address, params, prompt);
                self.store.upsert(&record).await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::DollarTickerStrategy;
    use crate::test_support::{cast, StubCompletion, StubSearch};
    use chrono::Utc;
    use finder_core::Engagement;
    use request_store::StoreDb;
    use std::sync::Arc;

    const MEMECOIN_REPLY: &str = r#"{"text":"memecoin","engagement":"recasts","count":5}"#;

    fn use_case(completion: StubCompletion, search: StubSearch) -> AnalyzeUseCase {
        let store = AnalyzeRequestStore::new(StoreDb::in_memory().unwrap());
        use_case_on(store, completion, search)
    }

    fn use_case_on(store: AnalyzeRequestStore, completion: StubCompletion, search: StubSearch) -> AnalyzeUseCase {
        let orchestrator = SearchOrchestrator::new(Arc::new(search), Arc::new(DollarTickerStrategy));
        AnalyzeUseCase::new(PromptTranslator::new(Arc::new(completion)), store, orchestrator)
    }

    fn two_casts() -> Vec<SearchResultItem> {
        let now = Utc::now().timestamp_millis();
        vec![
            cast("0x1", "gm frens", now - 1_000),
            cast("0x2", "loading up on $DEGEN", now - 2_000),
        ]
    }

    #[tokio::test]
    async fn test_analyze_translates_persists_and_searches() {
        let uc = use_case(StubCompletion::replying(MEMECOIN_REPLY), StubSearch::returning(two_casts()));

        let response = uc.analyze("0xAB", "find me a memecoin").await.unwrap();
        assert_eq!(response.parameters.engagement, Engagement::Recasts);
        assert_eq!(response.parameters.count, Some(5));
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.first_ticker.as_deref(), Some("$DEGEN"));
        assert_eq!(response.suggestion, None);

        let stored = uc.store().get_by_key("0xAB").await.unwrap().unwrap();
        assert_eq!(stored.text, "memecoin");
        assert_eq!(stored.count, Some(5));
        assert_eq!(stored.prompt, "find me a memecoin");
    }

    #[tokio::test]
    async fn test_second_analyze_updates_existing_record() {
        let completion = StubCompletion::sequence(&[
            MEMECOIN_REPLY,
            r#"{"text":"ai coin","engagement":"watches"}"#,
        ]);
        let uc = use_case(completion, StubSearch::returning(Vec::new()));

        uc.analyze("0xAB", "find me a memecoin").await.unwrap();
        uc.analyze("0xAB", "any ai coins?").await.unwrap();

        let all = uc.store().list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "ai coin");
        assert_eq!(all[0].engagement, Engagement::Watches);
        assert_eq!(all[0].count, None);
        assert_eq!(all[0].prompt, "any ai coins?");
    }

    #[tokio::test]
    async fn test_search_failure_still_records_request() {
        let uc = use_case(
            StubCompletion::replying(MEMECOIN_REPLY),
            StubSearch::failing(503, "unavailable"),
        );

        let err = uc.analyze("0xAB", "find me a memecoin").await.unwrap_err();
        assert!(matches!(err, FinderError::ExternalService { .. }));
        assert!(uc.store().get_by_key("0xAB").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_translation_failure_persists_nothing() {
        let uc = use_case(StubCompletion::replying("no idea"), StubSearch::returning(two_casts()));

        let err = uc.analyze("0xAB", "find me a memecoin").await.unwrap_err();
        assert!(matches!(err, FinderError::Translation(_)));
        assert!(uc.store().list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_age_limit_filters_results() {
        let now = Utc::now().timestamp_millis();
        let items = vec![
            cast("old", "$OLD", now - 30 * 86_400_000),
            cast("fresh", "$NEW", now - 60_000),
        ];
        let uc = use_case(
            StubCompletion::replying(r#"{"text":"memecoin","engagement":"reactions","age_limit_days":7}"#),
            StubSearch::returning(items),
        );

        let response = uc.analyze("0xAB", "memecoins under a week old").await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].post_id, "fresh");
        // ticker comes from the unfiltered result set
        assert_eq!(response.first_ticker.as_deref(), Some("$OLD"));
    }

    #[tokio::test]
    async fn test_empty_wallet_is_bad_request() {
        let uc = use_case(StubCompletion::replying(MEMECOIN_REPLY), StubSearch::returning(Vec::new()));
        let err = uc.analyze("  ", "find me a memecoin").await.unwrap_err();
        assert!(matches!(err, FinderError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_replay_uses_stored_query() {
        let uc = use_case(StubCompletion::replying(MEMECOIN_REPLY), StubSearch::returning(two_casts()));
        uc.analyze("0xAB", "find me a memecoin").await.unwrap();

        let replay = uc.replay("0xAB").await.unwrap();
        assert_eq!(replay.status, "success");
        assert_eq!(replay.parameters.text, "memecoin");
        assert_eq!(replay.parameters.count, Some(5));
        assert_eq!(replay.results.len(), 2);
    }

    #[tokio::test]
    async fn test_replay_unknown_wallet_is_not_found() {
        let uc = use_case(StubCompletion::replying(MEMECOIN_REPLY), StubSearch::returning(Vec::new()));
        let err = uc.replay("0xNOPE").await.unwrap_err();
        assert!(matches!(err, FinderError::NotFound(_)));
    }

    fn ai_coin_params() -> QueryParams {
        QueryParams {
            text: "ai coin".to_string(),
            engagement: Engagement::Watches,
            count: None,
            username: None,
            age_limit_days: None,
        }
    }

    #[tokio::test]
    async fn test_lost_insert_race_falls_back_to_update() {
        let uc = use_case(StubCompletion::replying(MEMECOIN_REPLY), StubSearch::returning(Vec::new()));
        uc.analyze("0xAB", "find me a memecoin").await.unwrap();

        // the row appeared after persist saw nothing
        uc.insert_new("0xAB", &ai_coin_params(), "any ai coins?").await.unwrap();

        let all = uc.store().list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "ai coin");
        assert_eq!(all[0].count, None);
        assert_eq!(all[0].prompt, "any ai coins?");
    }

    #[tokio::test]
    async fn test_row_deleted_before_update_is_recreated() {
        let uc = use_case(StubCompletion::replying(MEMECOIN_REPLY), StubSearch::returning(Vec::new()));
        uc.analyze("0xAB", "find me a memecoin").await.unwrap();
        assert!(uc.store().delete("0xAB").await.unwrap());

        uc.update_existing("0xAB", &ai_coin_params(), "any ai coins?").await.unwrap();

        let stored = uc.store().get_by_key("0xAB").await.unwrap().unwrap();
        assert_eq!(stored.text, "ai coin");
        assert_eq!(stored.engagement, Engagement::Watches);
        assert_eq!(stored.prompt, "any ai coins?");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_analyze_on_one_wallet_keeps_one_row() {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let path = std::env::temp_dir().join(format!("token_finder_uc_{}_{}.db", std::process::id(), nanos));
        let store = AnalyzeRequestStore::new(StoreDb::connect_lazy(&format!("sqlite:{}", path.display())).unwrap());
        let uc = use_case_on(store, StubCompletion::replying(MEMECOIN_REPLY), StubSearch::returning(two_casts()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let uc = uc.clone();
                tokio::spawn(async move { uc.analyze("0xAB", "find me a memecoin").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let all = uc.store().list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].wallet_address, "0xAB");

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
