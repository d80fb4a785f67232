//! Scanner Service
//!
//! Runs every configured discovery source on its own interval, each in its
//! own task so a stuck source never blocks the others. Mentions pass through
//! the source's keyword/regex filter, get deduplicated by (source, item_id),
//! have candidate token addresses extracted, and flow to the orchestrator as
//! events on a typed queue.

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::adapters::sources::ScannerRouter;
use crate::domain::mention::{Mention, MonitoredSource, SourceConfigError};
use crate::domain::ttl_cache::TtlCache;

/// Poll granularity of the per-source loops.
const POLL_TICK: Duration = Duration::from_secs(1);

/// How long a (source, item_id) pair stays in the dedup cache.
const SEEN_TTL: Duration = Duration::from_secs(24 * 3600);

/// A filtered mention with the token addresses found in it.
#[derive(Debug, Clone)]
pub struct MentionEvent {
    pub mention: Mention,
    pub addresses: Vec<String>,
}

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b([1-9A-HJ-NP-Za-km-z]{32,44})\b").expect("valid pattern"))
}

/// Extract base58 token addresses from mention text, deduplicated in order
/// of first appearance.
pub fn extract_addresses(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    address_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|addr| seen.insert(addr.clone()))
        .collect()
}

pub struct ScannerService {
    router: Arc<ScannerRouter>,
    sources: RwLock<Vec<MonitoredSource>>,
    events_tx: mpsc::Sender<MentionEvent>,
    seen: Mutex<TtlCache<(String, String), ()>>,
    is_running: RwLock<bool>,
}

impl ScannerService {
    /// Build the service, validating every source up front. Returns the
    /// service plus the receiving end of the mention queue.
    pub fn new(
        router: Arc<ScannerRouter>,
        sources: Vec<MonitoredSource>,
        queue_capacity: usize,
    ) -> Result<(Arc<Self>, mpsc::Receiver<MentionEvent>), SourceConfigError> {
        for source in &sources {
            source.validate()?;
        }

        let (events_tx, events_rx) = mpsc::channel(queue_capacity);
        let service = Arc::new(Self {
            router,
            sources: RwLock::new(sources),
            events_tx,
            seen: Mutex::new(TtlCache::new(SEEN_TTL)),
            is_running: RwLock::new(false),
        });
        Ok((service, events_rx))
    }

    /// Spawn one scan loop per source and return. Loops exit when
    /// [`stop`](Self::stop) is called.
    pub async fn start(self: Arc<Self>) {
        *self.is_running.write().await = true;
        let count = self.sources.read().await.len();
        info!(sources = count, "Scanner service starting");

        for index in 0..count {
            let service = Arc::clone(&self);
            tokio::spawn(async move {
                service.source_loop(index).await;
            });
        }
    }

    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        info!("Scanner service stopping");
    }

    async fn source_loop(&self, index: usize) {
        loop {
            if !*self.is_running.read().await {
                return;
            }
            let due = {
                let sources = self.sources.read().await;
                match sources.get(index) {
                    Some(source) => source.should_scan(Utc::now()),
                    None => return,
                }
            };
            if due {
                self.scan_source(index).await;
            }
            tokio::time::sleep(POLL_TICK).await;
        }
    }

    /// Run one scan cycle for the source at `index`.
    pub async fn scan_source(&self, index: usize) {
        let source = {
            let sources = self.sources.read().await;
            match sources.get(index) {
                Some(source) if source.active => source.clone(),
                _ => return,
            }
        };

        match self.router.scan(&source).await {
            Ok(batch) => {
                let emitted = self.emit_mentions(&source, batch.mentions).await;
                debug!(
                    source = %source.identifier,
                    emitted,
                    "Scan cycle complete"
                );
                let mut sources = self.sources.write().await;
                if let Some(entry) = sources.get_mut(index) {
                    entry.record_success(Utc::now());
                    if batch.cursor.is_some() {
                        entry.cursor = batch.cursor;
                    }
                }
            }
            Err(e) => {
                warn!(source = %source.identifier, error = %e, "Scan failed");
                let mut sources = self.sources.write().await;
                if let Some(entry) = sources.get_mut(index) {
                    entry.record_failure(Utc::now(), e.to_string());
                    if !entry.active {
                        warn!(
                            source = %entry.identifier,
                            errors = entry.error_count,
                            "Source deactivated after repeated failures"
                        );
                    }
                }
            }
        }
    }

    /// Filter, dedupe and forward mentions; returns how many were emitted.
    async fn emit_mentions(&self, source: &MonitoredSource, mentions: Vec<Mention>) -> usize {
        let filter = match source.filter() {
            Ok(filter) => filter,
            Err(e) => {
                // Validated at config time, so this is unexpected
                warn!(source = %source.identifier, error = %e, "Filter compile failed");
                return 0;
            }
        };

        let mut emitted = 0;
        for mention in mentions {
            if !filter.matches(&mention.text) {
                continue;
            }

            let key = mention.dedup_key();
            {
                let mut seen = self.seen.lock().await;
                if seen.contains(&key) {
                    continue;
                }
                seen.insert(key, ());
            }

            let event = MentionEvent {
                addresses: extract_addresses(&mention.text),
                mention,
            };
            if self.events_tx.send(event).await.is_err() {
                warn!("Mention queue closed, dropping event");
                return emitted;
            }
            emitted += 1;
        }
        emitted
    }

    /// Current source states, for the operator surface.
    pub async fn sources(&self) -> Vec<MonitoredSource> {
        self.sources.read().await.clone()
    }
}
