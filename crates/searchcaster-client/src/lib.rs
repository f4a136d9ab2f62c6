pub mod error;
mod models;

pub use error::{SearchError, SearchResult};

use async_trait::async_trait;
use finder_core::{CastSearch, FinderError, RetryPolicy, SearchQuery, SearchResultItem};
use reqwest::Client;
use std::time::Duration;

use models::SearchResponse;

#[derive(Debug, Clone)]
pub struct SearchcasterConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

#[derive(Clone)]
pub struct SearchcasterClient {
    base_url: String,
    client: Client,
    retry: RetryPolicy,
}

impl SearchcasterClient {
    pub fn new(config: SearchcasterConfig) -> SearchResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            retry: config.retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request, retrying transport failures, 429 and 5xx up to the policy budget.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> SearchResult<reqwest::Response> {
        let request = builder.build()?;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| SearchError::InvalidResponse("Cannot clone request".to_string()))?;

            match self.client.execute(req_clone).await {
                Ok(response)
                    if RetryPolicy::is_retryable_status(response.status().as_u16())
                        && self.retry.has_attempts_left(attempt) =>
                {
                    tracing::warn!(
                        "Searchcaster returned {}, retrying {}/{}",
                        response.status(),
                        attempt,
                        self.retry.max_attempts
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if self.retry.has_attempts_left(attempt) => {
                    tracing::warn!(
                        "Searchcaster request failed ({}), retrying {}/{}",
                        e,
                        attempt,
                        self.retry.max_attempts
                    );
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(self.retry.delay_after(attempt)).await;
        }
    }

    /// Search casts. A non-2xx answer is an error, never an empty result.
    pub async fn search_casts(&self, query: &SearchQuery) -> SearchResult<Vec<SearchResultItem>> {
        let url = format!("{}/api/search", self.base_url);

        let response = self
            .send_request(self.client.get(&url).query(&query.to_pairs()))
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let search_response: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        let items: Vec<SearchResultItem> = search_response
            .casts
            .into_iter()
            .map(SearchResultItem::from)
            .collect();

        tracing::debug!("Searchcaster returned {} casts for '{}'", items.len(), query.text);
        Ok(items)
    }
}

#[async_trait]
impl CastSearch for SearchcasterClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>, FinderError> {
        Ok(self.search_casts(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = SearchcasterClient::new(SearchcasterConfig {
            base_url: "https://searchcaster.xyz/".to_string(),
            timeout: Duration::from_secs(1),
            retry: RetryPolicy::none(),
        })
        .unwrap();
        assert_eq!(client.base_url(), "https://searchcaster.xyz");
    }

    #[test]
    fn test_status_error_keeps_upstream_status() {
        let err: FinderError = SearchError::Status {
            status: 503,
            body: "maintenance".to_string(),
        }
        .into();
        match err {
            FinderError::ExternalService { service, status, message } => {
                assert_eq!(service, "searchcaster");
                assert_eq!(status, Some(503));
                assert!(message.contains("maintenance"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let client = SearchcasterClient::new(SearchcasterConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(500),
            retry: RetryPolicy::none(),
        })
        .unwrap();

        let query = SearchQuery {
            text: "memecoin".to_string(),
            ..Default::default()
        };
        assert!(client.search_casts(&query).await.is_err());
    }

    const CASTS_BODY: &str = r#"{"casts":[{"merkleRoot":"0xabc","body":{"publishedAt":1700000000000,"username":"dwr","data":{"text":"gm $DEGEN"}},"meta":{"displayName":"Dan","recasts":{"count":4}}}]}"#;

    /// Local search endpoint answering with the scripted (status, body) pairs in
    /// order; the last pair repeats. Returns the base URL and a hit counter.
    async fn scripted_search(script: Vec<(u16, &'static str)>, delay: Duration) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        let app = axum::Router::new().route(
            "/api/search",
            axum::routing::get(move || {
                let counter = counter.clone();
                let script = script.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                    let (status, body) = script[n.min(script.len() - 1)];
                    (StatusCode::from_u16(status).unwrap(), body)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), hits)
    }

    fn client_for(base_url: String, timeout: Duration, attempts: u32) -> SearchcasterClient {
        SearchcasterClient::new(SearchcasterConfig {
            base_url,
            timeout,
            retry: RetryPolicy::new(attempts, Duration::from_millis(5)),
        })
        .unwrap()
    }

    fn memecoin_query() -> SearchQuery {
        SearchQuery {
            text: "memecoin".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_until_success() {
        let (url, hits) = scripted_search(vec![(503, "busy"), (502, "busy"), (200, CASTS_BODY)], Duration::ZERO).await;
        let client = client_for(url, Duration::from_secs(5), 3);

        let items = client.search_casts(&memecoin_query()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].post_id, "0xabc");
        assert_eq!(items[0].recasts, 4);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_attempt_budget() {
        let (url, hits) = scripted_search(vec![(429, "slow down")], Duration::ZERO).await;
        let client = client_for(url, Duration::from_secs(5), 3);

        let err = client.search_casts(&memecoin_query()).await.unwrap_err();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(matches!(err, SearchError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let (url, hits) = scripted_search(vec![(400, "bad engagement"), (200, CASTS_BODY)], Duration::ZERO).await;
        let client = client_for(url, Duration::from_secs(5), 3);

        let err: FinderError = client.search(&memecoin_query()).await.unwrap_err();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        match err {
            FinderError::ExternalService { service, status, message } => {
                assert_eq!(service, "searchcaster");
                assert_eq!(status, Some(400));
                assert!(message.contains("bad engagement"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_counts_as_transport_failure() {
        let (url, hits) = scripted_search(vec![(200, CASTS_BODY)], Duration::from_millis(500)).await;
        let client = client_for(url, Duration::from_millis(50), 2);

        let err = client.search_casts(&memecoin_query()).await.unwrap_err();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        match err {
            SearchError::RequestFailed(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
