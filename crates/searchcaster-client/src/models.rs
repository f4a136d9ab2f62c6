//! Wire shapes of the Searchcaster `/api/search` response.

use finder_core::SearchResultItem;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub casts: Vec<Cast>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Cast {
    #[serde(default)]
    pub merkle_root: String,
    #[serde(default)]
    pub body: CastBody,
    #[serde(default)]
    pub meta: CastMeta,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CastBody {
    #[serde(default)]
    pub published_at: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub data: CastData,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CastData {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CastMeta {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub reactions: CountField,
    #[serde(default)]
    pub recasts: CountField,
    #[serde(default)]
    pub watches: CountField,
    #[serde(default)]
    pub num_reply_children: u64,
    #[serde(default)]
    pub tags: Vec<serde_json::Value>,
    #[serde(default)]
    pub mentions: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CountField {
    #[serde(default)]
    pub count: u64,
}

impl From<Cast> for SearchResultItem {
    fn from(cast: Cast) -> Self {
        SearchResultItem {
            post_id: cast.merkle_root,
            text: cast.body.data.text,
            username: cast.body.username,
            display_name: cast.meta.display_name,
            reactions: cast.meta.reactions.count,
            recasts: cast.meta.recasts.count,
            replies: cast.meta.num_reply_children,
            watches: cast.meta.watches.count,
            tags: cast.meta.tags,
            mentions: cast.meta.mentions,
            published_at: cast.body.published_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cast_maps_every_field() {
        let raw = r#"{
            "casts": [{
                "merkleRoot": "0xdeadbeef",
                "body": {
                    "publishedAt": 1700000000000,
                    "username": "dwr",
                    "data": {"text": "launching $DEGEN today"}
                },
                "meta": {
                    "displayName": "Dan",
                    "reactions": {"count": 12, "type": "Like"},
                    "recasts": {"count": 3},
                    "watches": {"count": 1},
                    "numReplyChildren": 4,
                    "tags": [{"type": "channel", "id": "memes"}],
                    "mentions": []
                }
            }]
        }"#;

        let response: SearchResponse = serde_json::from_str(raw).unwrap();
        let items: Vec<SearchResultItem> = response.casts.into_iter().map(Into::into).collect();

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.post_id, "0xdeadbeef");
        assert_eq!(item.text, "launching $DEGEN today");
        assert_eq!(item.username, "dwr");
        assert_eq!(item.display_name, "Dan");
        assert_eq!((item.reactions, item.recasts, item.replies, item.watches), (12, 3, 4, 1));
        assert_eq!(item.tags.len(), 1);
        assert_eq!(item.published_at, 1_700_000_000_000);
    }

    #[test]
    fn test_sparse_cast_uses_defaults() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"casts":[{"body":{"data":{"text":"gm"}}}]}"#).unwrap();
        let item: SearchResultItem = response.casts.into_iter().next().unwrap().into();
        assert_eq!(item.text, "gm");
        assert_eq!(item.reactions, 0);
        assert_eq!(item.published_at, 0);
        assert!(item.post_id.is_empty());
    }

    #[test]
    fn test_missing_casts_array_is_empty() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.casts.is_empty());
    }
}
