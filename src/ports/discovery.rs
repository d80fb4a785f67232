//! Discovery Port
//!
//! Contract for scanning one kind of discovery source. Scans are
//! idempotent-safe: a re-scan may return already-seen items, and consumers
//! dedupe by (source, item_id).

use async_trait::async_trait;
use thiserror::Error;

use super::provider::ProviderError;
use crate::domain::mention::{Mention, MonitoredSource, SourceKind};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Malformed source payload: {0}")]
    Decode(String),

    #[error("Source kind {0} is not supported by this scanner")]
    Unsupported(String),
}

/// Result of one scan: mentions since the source's cursor, ordered oldest
/// first, plus the new cursor to persist.
#[derive(Debug, Clone, Default)]
pub struct ScanBatch {
    pub mentions: Vec<Mention>,
    pub cursor: Option<String>,
}

/// One scanner implementation per source kind.
#[async_trait]
pub trait DiscoveryScanner: Send + Sync {
    /// The source kind this scanner handles.
    fn kind(&self) -> SourceKind;

    /// Fetch mentions newer than the source's cursor.
    async fn scan(&self, source: &MonitoredSource) -> Result<ScanBatch, ScanError>;
}
