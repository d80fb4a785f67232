//! Social Posts Scanner
//!
//! Polls a social-data API for new posts from a tracked account. The source
//! identifier is the account handle; the cursor is the last post id.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapters::providers::FetchClient;
use crate::domain::mention::{Mention, MonitoredSource, SourceKind};
use crate::ports::discovery::{DiscoveryScanner, ScanBatch, ScanError};

use super::parse_timestamp;

const PAGE_LIMIT: usize = 50;

pub struct SocialScanner {
    client: Arc<FetchClient>,
}

impl SocialScanner {
    pub fn new(client: Arc<FetchClient>) -> Self {
        Self { client }
    }

    pub fn parse(source: &MonitoredSource, raw: &Value) -> Result<ScanBatch, ScanError> {
        let posts = raw
            .get("posts")
            .and_then(Value::as_array)
            .ok_or_else(|| ScanError::Decode("missing 'posts' array".into()))?;

        let mut mentions = Vec::new();
        let mut cursor = source.cursor.clone();

        for post in posts {
            let Some(id) = post
                .get("id")
                .map(|v| v.to_string().trim_matches('"').to_string())
            else {
                continue;
            };
            let Some(text) = post.get("text").and_then(Value::as_str) else {
                continue;
            };

            let attachments = post
                .get("media")
                .and_then(Value::as_array)
                .map(|m| {
                    m.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();

            mentions.push(Mention {
                source: source.identifier.clone(),
                item_id: id.clone(),
                text: text.to_string(),
                timestamp: parse_timestamp(post.get("created_at")),
                origin_url: post
                    .get("url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                attachments,
            });
            cursor = Some(id);
        }

        Ok(ScanBatch { mentions, cursor })
    }
}

#[async_trait]
impl DiscoveryScanner for SocialScanner {
    fn kind(&self) -> SourceKind {
        SourceKind::Social
    }

    async fn scan(&self, source: &MonitoredSource) -> Result<ScanBatch, ScanError> {
        let path = format!("/users/{}/posts", source.identifier);
        let mut params = vec![("limit", PAGE_LIMIT.to_string())];
        if let Some(cursor) = &source.cursor {
            params.push(("since_id", cursor.clone()));
        }

        let raw = self.client.get(&path, &params, None).await?;
        Self::parse(source, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> MonitoredSource {
        MonitoredSource::new(SourceKind::Social, "alphacaller")
    }

    #[test]
    fn test_parse_posts() {
        let raw = json!({
            "posts": [
                {"id": "901", "text": "watch $PEPE2", "created_at": "2025-06-01T12:00:00Z", "url": "https://social/901"},
                {"id": "902", "text": "ca: Addr111", "created_at": "2025-06-01T12:05:00Z",
                 "url": "https://social/902", "media": ["https://img/x.png"]}
            ]
        });

        let batch = SocialScanner::parse(&source(), &raw).unwrap();
        assert_eq!(batch.mentions.len(), 2);
        assert_eq!(batch.cursor.as_deref(), Some("902"));
        assert_eq!(batch.mentions[1].attachments.len(), 1);
    }

    #[test]
    fn test_parse_missing_posts_is_decode_error() {
        assert!(matches!(
            SocialScanner::parse(&source(), &json!({})),
            Err(ScanError::Decode(_))
        ));
    }

    #[test]
    fn test_numeric_ids_are_stringified() {
        let raw = json!({"posts": [{"id": 77, "text": "gm", "created_at": 1700000000}]});
        let batch = SocialScanner::parse(&source(), &raw).unwrap();
        assert_eq!(batch.mentions[0].item_id, "77");
    }
}
