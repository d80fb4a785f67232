//! JSON Feed Scanner
//!
//! Polls a JSON Feed (jsonfeed.org) for new items. The source identifier is
//! the feed URL; the cursor is the newest item id already consumed. Feeds
//! list newest first, so the scan collects until it meets the cursor, then
//! reverses to oldest-first order.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapters::providers::FetchClient;
use crate::domain::mention::{Mention, MonitoredSource, SourceKind};
use crate::ports::discovery::{DiscoveryScanner, ScanBatch, ScanError};

use super::parse_timestamp;

pub struct FeedScanner {
    client: Arc<FetchClient>,
}

impl FeedScanner {
    pub fn new(client: Arc<FetchClient>) -> Self {
        Self { client }
    }

    pub fn parse(source: &MonitoredSource, raw: &Value) -> Result<ScanBatch, ScanError> {
        let items = raw
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| ScanError::Decode("missing 'items' array".into()))?;

        let mut mentions = Vec::new();
        for item in items {
            let Some(id) = item.get("id").and_then(Value::as_str) else {
                continue;
            };
            if source.cursor.as_deref() == Some(id) {
                break; // everything below is already seen
            }

            let title = item.get("title").and_then(Value::as_str).unwrap_or("");
            let body = item
                .get("content_text")
                .and_then(Value::as_str)
                .unwrap_or("");
            let text = if title.is_empty() {
                body.to_string()
            } else if body.is_empty() {
                title.to_string()
            } else {
                format!("{title}\n\n{body}")
            };
            if text.is_empty() {
                continue;
            }

            mentions.push(Mention {
                source: source.identifier.clone(),
                item_id: id.to_string(),
                text,
                timestamp: parse_timestamp(item.get("date_published")),
                origin_url: item
                    .get("url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                attachments: Vec::new(),
            });
        }

        // Newest-first input; emit oldest first and cursor at the newest id
        let cursor = mentions
            .first()
            .map(|m| m.item_id.clone())
            .or_else(|| source.cursor.clone());
        mentions.reverse();

        Ok(ScanBatch { mentions, cursor })
    }
}

#[async_trait]
impl DiscoveryScanner for FeedScanner {
    fn kind(&self) -> SourceKind {
        SourceKind::Feed
    }

    async fn scan(&self, source: &MonitoredSource) -> Result<ScanBatch, ScanError> {
        // The identifier is the full feed URL
        let raw = self.client.get(&source.identifier, &[], None).await?;
        Self::parse(source, &raw)
    }
}
