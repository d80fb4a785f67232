//! Chat Relay Scanner
//!
//! Polls a chat-relay export API for group messages. The relay mirrors chat
//! groups as JSON; the source identifier is the group id and the cursor is
//! the last message id already consumed.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapters::providers::FetchClient;
use crate::domain::mention::{Mention, MonitoredSource, SourceKind};
use crate::ports::discovery::{DiscoveryScanner, ScanBatch, ScanError};

use super::parse_timestamp;

/// Messages fetched per scan.
const PAGE_LIMIT: usize = 50;

pub struct ChatScanner {
    client: Arc<FetchClient>,
}

impl ChatScanner {
    pub fn new(client: Arc<FetchClient>) -> Self {
        Self { client }
    }

    /// Parse a relay messages payload into mentions, oldest first.
    pub fn parse(source: &MonitoredSource, raw: &Value) -> Result<ScanBatch, ScanError> {
        let messages = raw
            .get("messages")
            .and_then(Value::as_array)
            .ok_or_else(|| ScanError::Decode("missing 'messages' array".into()))?;

        let mut mentions = Vec::new();
        let mut cursor = source.cursor.clone();

        for message in messages {
            let Some(id) = message
                .get("id")
                .map(|v| v.to_string().trim_matches('"').to_string())
            else {
                continue;
            };
            let Some(text) = message.get("text").and_then(Value::as_str) else {
                continue; // media-only messages carry no scannable text
            };
            let attachments = message
                .get("attachments")
                .and_then(Value::as_array)
                .map(|a| {
                    a.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();

            mentions.push(Mention {
                source: source.identifier.clone(),
                item_id: id.clone(),
                text: text.to_string(),
                timestamp: parse_timestamp(message.get("date")),
                origin_url: message
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
impl DiscoveryScanner for ChatScanner {
    fn kind(&self) -> SourceKind {
        SourceKind::Chat
    }

    async fn scan(&self, source: &MonitoredSource) -> Result<ScanBatch, ScanError> {
        let path = format!("/groups/{}/messages", source.identifier);
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
        MonitoredSource::new(SourceKind::Chat, "alpha-group")
    }

    #[test]
    fn test_parse_messages() {
        let raw = json!({
            "messages": [
                {"id": 101, "text": "new gem $BONK", "date": 1700000000, "url": "https://chat/101"},
                {"id": 102, "text": "ape in", "date": 1700000060, "url": "https://chat/102",
                 "attachments": ["https://img/1.png"]}
            ]
        });

        let batch = ChatScanner::parse(&source(), &raw).unwrap();
        assert_eq!(batch.mentions.len(), 2);
        assert_eq!(batch.cursor.as_deref(), Some("102"));
        assert_eq!(batch.mentions[0].item_id, "101");
        assert_eq!(batch.mentions[0].source, "alpha-group");
        assert_eq!(batch.mentions[1].attachments.len(), 1);
    }

    #[test]
    fn test_parse_skips_textless_messages() {
        let raw = json!({
            "messages": [
                {"id": 1, "date": 1700000000},
                {"id": 2, "text": "real text", "date": 1700000001}
            ]
        });
        let batch = ChatScanner::parse(&source(), &raw).unwrap();
        assert_eq!(batch.mentions.len(), 1);
        assert_eq!(batch.mentions[0].item_id, "2");
    }

    #[test]
    fn test_parse_missing_messages_is_decode_error() {
        let result = ChatScanner::parse(&source(), &json!({"oops": true}));
        assert!(matches!(result, Err(ScanError::Decode(_))));
    }

    #[test]
    fn test_empty_batch_keeps_existing_cursor() {
        let mut src = source();
        src.cursor = Some("99".to_string());
        let batch = ChatScanner::parse(&src, &json!({"messages": []})).unwrap();
        assert!(batch.mentions.is_empty());
        assert_eq!(batch.cursor.as_deref(), Some("99"));
    }
}
