//! Discovery Source Adapters
//!
//! One scanner per source kind (chat relay, JSON feed, code repository,
//! social posts), all polling JSON HTTP endpoints through a [`FetchClient`].
//! The router dispatches a source to its scanner; unknown kinds yield an
//! empty batch and a log line rather than an error.

pub mod chat;
pub mod feed;
pub mod repository;
pub mod social;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::warn;

use crate::domain::mention::{MonitoredSource, SourceKind};
use crate::ports::discovery::{DiscoveryScanner, ScanBatch, ScanError};

pub use chat::ChatScanner;
pub use feed::FeedScanner;
pub use repository::RepositoryScanner;
pub use social::SocialScanner;

/// Dispatches sources to the scanner registered for their kind.
pub struct ScannerRouter {
    scanners: HashMap<SourceKind, Arc<dyn DiscoveryScanner>>,
}

impl ScannerRouter {
    pub fn new() -> Self {
        Self {
            scanners: HashMap::new(),
        }
    }

    pub fn register(mut self, scanner: Arc<dyn DiscoveryScanner>) -> Self {
        self.scanners.insert(scanner.kind(), scanner);
        self
    }

    /// Scan a source with its registered scanner. A kind with no scanner
    /// produces an empty batch.
    pub async fn scan(&self, source: &MonitoredSource) -> Result<ScanBatch, ScanError> {
        match self.scanners.get(&source.kind) {
            Some(scanner) => scanner.scan(source).await,
            None => {
                warn!(kind = %source.kind, identifier = %source.identifier, "Unknown source kind, skipping");
                Ok(ScanBatch::default())
            }
        }
    }

    pub fn supported_kinds(&self) -> Vec<SourceKind> {
        self.scanners.keys().cloned().collect()
    }
}

impl Default for ScannerRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a JSON timestamp that may be unix seconds or an RFC 3339 string.
pub(crate) fn parse_timestamp(value: Option<&Value>) -> DateTime<Utc> {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        _ => Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_router_unknown_kind_yields_empty_batch() {
        let router = ScannerRouter::new();
        let source = MonitoredSource::new(SourceKind::Other("pigeon".into()), "coop-7");

        let batch = router.scan(&source).await.unwrap();
        assert!(batch.mentions.is_empty());
        assert!(batch.cursor.is_none());
    }

    #[test]
    fn test_parse_timestamp_unix() {
        let ts = parse_timestamp(Some(&json!(1_700_000_000)));
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let ts = parse_timestamp(Some(&json!("2025-06-01T12:00:00Z")));
        assert_eq!(ts.timestamp(), 1_748_779_200);
    }

    #[test]
    fn test_parse_timestamp_garbage_falls_back_to_now() {
        let before = Utc::now();
        let ts = parse_timestamp(Some(&json!("not a date")));
        assert!(ts >= before);
    }
}
