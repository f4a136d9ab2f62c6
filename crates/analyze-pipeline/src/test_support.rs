use async_trait::async_trait;
use finder_core::{CastSearch, FinderError, SearchQuery, SearchResultItem, TextCompletion};
use std::sync::Mutex;

/// Text-completion stub returning canned replies in order; the last reply repeats.
pub(crate) struct StubCompletion {
    replies: Vec<Result<String, u16>>,
    seen: Mutex<Vec<(String, String)>>,
}

impl StubCompletion {
    pub(crate) fn replying(reply: &str) -> Self {
        Self::sequence(&[reply])
    }

    pub(crate) fn sequence(replies: &[&str]) -> Self {
        Self {
            replies: replies.iter().map(|r| Ok(r.to_string())).collect(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            replies: vec![Err(503)],
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub(crate) fn last_user_message(&self) -> Option<String> {
        self.seen.lock().unwrap().last().map(|(_, user)| user.clone())
    }
}

#[async_trait]
impl TextCompletion for StubCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<String, FinderError> {
        let mut seen = self.seen.lock().unwrap();
        let index = seen.len().min(self.replies.len() - 1);
        seen.push((system.to_string(), user.to_string()));

        match &self.replies[index] {
            Ok(reply) => Ok(reply.clone()),
            Err(status) => Err(FinderError::external(
                "text-completion",
                Some(*status),
                format!("HTTP {}", status),
            )),
        }
    }

    fn backend_name(&self) -> &'static str {
        "stub"
    }
}

/// Search stub returning fixed items or a fixed upstream failure.
pub(crate) struct StubSearch {
    result: Result<Vec<SearchResultItem>, (u16, String)>,
    queries: Mutex<Vec<SearchQuery>>,
}

impl StubSearch {
    pub(crate) fn returning(items: Vec<SearchResultItem>) -> Self {
        Self {
            result: Ok(items),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(status: u16, body: &str) -> Self {
        Self {
            result: Err((status, body.to_string())),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl CastSearch for StubSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>, FinderError> {
        self.queries.lock().unwrap().push(query.clone());
        match &self.result {
            Ok(items) => Ok(items.clone()),
            Err((status, body)) => Err(FinderError::external(
                "searchcaster",
                Some(*status),
                format!("HTTP {}: {}", status, body),
            )),
        }
    }
}

pub(crate) fn cast(post_id: &str, text: &str, published_at: i64) -> SearchResultItem {
    SearchResultItem {
        post_id: post_id.to_string(),
        text: text.to_string(),
        username: "caster".to_string(),
        display_name: "Caster".to_string(),
        reactions: 0,
        recasts: 0,
        replies: 0,
        watches: 0,
        tags: Vec::new(),
        mentions: Vec::new(),
        published_at,
    }
}
