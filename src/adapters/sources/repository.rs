//! Repository Scanner
//!
//! Polls a code-hosting API for new commits on a repository. The source
//! identifier is the `owner/repo` slug; the cursor is an RFC 3339 timestamp
//! of the newest commit already consumed. Commit messages frequently carry
//! fresh contract addresses before any social channel does.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapters::providers::FetchClient;
use crate::domain::mention::{Mention, MonitoredSource, SourceKind};
use crate::ports::discovery::{DiscoveryScanner, ScanBatch, ScanError};

use super::parse_timestamp;

const PAGE_LIMIT: usize = 50;

pub struct RepositoryScanner {
    client: Arc<FetchClient>,
}

impl RepositoryScanner {
    pub fn new(client: Arc<FetchClient>) -> Self {
        Self { client }
    }

    pub fn parse(source: &MonitoredSource, raw: &Value) -> Result<ScanBatch, ScanError> {
        let commits = raw
            .as_array()
            .ok_or_else(|| ScanError::Decode("expected a commit array".into()))?;

        let mut mentions = Vec::new();
        let mut newest: Option<String> = None;

        // The API returns newest first
        for commit in commits {
            let Some(sha) = commit.get("sha").and_then(Value::as_str) else {
                continue;
            };
            let Some(message) = commit
                .get("commit")
                .and_then(|c| c.get("message"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            let timestamp = parse_timestamp(
                commit
                    .get("commit")
                    .and_then(|c| c.get("author"))
                    .and_then(|a| a.get("date")),
            );

            if newest.is_none() {
                newest = Some(timestamp.to_rfc3339());
            }

            mentions.push(Mention {
                source: source.identifier.clone(),
                item_id: sha.to_string(),
                text: message.to_string(),
                timestamp,
                origin_url: commit
                    .get("html_url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                attachments: Vec::new(),
            });
        }

        mentions.reverse();
        Ok(ScanBatch {
            mentions,
            cursor: newest.or_else(|| source.cursor.clone()),
        })
    }
}

#[async_trait]
impl DiscoveryScanner for RepositoryScanner {
    fn kind(&self) -> SourceKind {
        SourceKind::Repository
    }

    async fn scan(&self, source: &MonitoredSource) -> Result<ScanBatch, ScanError> {
        let path = format!("/repos/{}/commits", source.identifier);
        let mut params = vec![("per_page", PAGE_LIMIT.to_string())];
        if let Some(cursor) = &source.cursor {
            params.push(("since", cursor.clone()));
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
        MonitoredSource::new(SourceKind::Repository, "memelabs/deployer")
    }

    fn commits() -> Value {
        json!([
            {
                "sha": "bbb222",
                "commit": {"message": "deploy token at So1anaAddr", "author": {"date": "2025-06-02T10:00:00Z"}},
                "html_url": "https://git.example/c/bbb222"
            },
            {
                "sha": "aaa111",
                "commit": {"message": "initial commit", "author": {"date": "2025-06-01T10:00:00Z"}},
                "html_url": "https://git.example/c/aaa111"
            }
        ])
    }

    #[test]
    fn test_parse_commits_oldest_first() {
        let batch = RepositoryScanner::parse(&source(), &commits()).unwrap();
        assert_eq!(batch.mentions.len(), 2);
        assert_eq!(batch.mentions[0].item_id, "aaa111");
        assert_eq!(batch.mentions[1].item_id, "bbb222");
    }

    #[test]
    fn test_cursor_is_newest_commit_time() {
        let batch = RepositoryScanner::parse(&source(), &commits()).unwrap();
        assert_eq!(batch.cursor.as_deref(), Some("2025-06-02T10:00:00+00:00"));
    }

    #[test]
    fn test_parse_non_array_is_decode_error() {
        assert!(matches!(
            RepositoryScanner::parse(&source(), &json!({"message": "Not Found"})),
            Err(ScanError::Decode(_))
        ));
    }

    #[test]
    fn test_empty_array_keeps_cursor() {
        let mut src = source();
        src.cursor = Some("2025-06-01T00:00:00Z".to_string());
        let batch = RepositoryScanner::parse(&src, &json!([])).unwrap();
        assert!(batch.mentions.is_empty());
        assert_eq!(batch.cursor.as_deref(), Some("2025-06-01T00:00:00Z"));
    }
}
