//! JSONL Store
//!
//! File-backed [`TokenStore`]: one JSON-lines file per record type under a
//! data directory, with an in-memory index rebuilt on startup. Appends are
//! all-or-nothing per record: the line is written and flushed before the
//! index is updated, and a failed write leaves the index untouched. Corrupt
//! lines found at load time are logged and skipped rather than failing the
//! boot.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::alert::{Alert, AlertKind};
use crate::domain::scoring::CompositeScore;
use crate::domain::token::{MarketSnapshot, Token};
use crate::ports::persistence::{PersistenceError, TokenStore};

const TOKENS_FILE: &str = "tokens.jsonl";
const SNAPSHOTS_FILE: &str = "snapshots.jsonl";
const SCORES_FILE: &str = "scores.jsonl";
const ALERTS_FILE: &str = "alerts.jsonl";

#[derive(Default)]
struct Index {
    tokens: HashMap<String, Token>,
    snapshots: Vec<MarketSnapshot>,
    scores: Vec<CompositeScore>,
    alerts: Vec<Alert>,
}

pub struct JsonlStore {
    dir: PathBuf,
    index: Mutex<Index>,
}

impl JsonlStore {
    /// Open (or create) a store under the given directory, rebuilding the
    /// in-memory index from existing files.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let mut index = Index::default();
        for token in load_lines::<Token>(&dir.join(TOKENS_FILE))? {
            index.tokens.insert(token.address.clone(), token);
        }
        index.snapshots = load_lines(&dir.join(SNAPSHOTS_FILE))?;
        index.scores = load_lines(&dir.join(SCORES_FILE))?;
        index.alerts = load_lines(&dir.join(ALERTS_FILE))?;

        Ok(Self {
            dir,
            index: Mutex::new(index),
        })
    }

    /// Token identity record, if one was ever upserted.
    pub async fn token(&self, address: &str) -> Option<Token> {
        self.index.lock().await.tokens.get(address).cloned()
    }

    fn append_line<T: Serialize>(&self, file: &str, record: &T) -> Result<(), PersistenceError> {
        let line = serde_json::to_string(record)?;
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))?;
        writeln!(handle, "{line}")?;
        handle.flush()?;
        Ok(())
    }

    fn rewrite_file<T: Serialize>(&self, file: &str, records: &[T]) -> Result<(), PersistenceError> {
        let path = self.dir.join(file);
        let tmp = path.with_extension("jsonl.tmp");
        {
            let mut handle = File::create(&tmp)?;
            for record in records {
                writeln!(handle, "{}", serde_json::to_string(record)?)?;
            }
            handle.flush()?;
        }
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn load_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PersistenceError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(path = %path.display(), lineno, error = %e, "Skipping corrupt record");
            }
        }
    }
    Ok(records)
}

#[async_trait]
impl TokenStore for JsonlStore {
    async fn upsert_token(&self, token: &Token) -> Result<(), PersistenceError> {
        let mut index = self.index.lock().await;
        self.append_line(TOKENS_FILE, token)?;
        index.tokens.insert(token.address.clone(), token.clone());
        Ok(())
    }

    async fn append_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), PersistenceError> {
        let mut index = self.index.lock().await;
        self.append_line(SNAPSHOTS_FILE, snapshot)?;
        index.snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn append_score(&self, score: &CompositeScore) -> Result<(), PersistenceError> {
        let mut index = self.index.lock().await;
        self.append_line(SCORES_FILE, score)?;
        index.scores.push(score.clone());
        Ok(())
    }

    async fn append_alert(&self, alert: &Alert) -> Result<(), PersistenceError> {
        let mut index = self.index.lock().await;
        self.append_line(ALERTS_FILE, alert)?;
        index.alerts.push(alert.clone());
        Ok(())
    }

    async fn latest_snapshot(
        &self,
        address: &str,
    ) -> Result<Option<MarketSnapshot>, PersistenceError> {
        let index = self.index.lock().await;
        Ok(index
            .snapshots
            .iter()
            .rev()
            .find(|s| s.address == address)
            .cloned())
    }

    async fn previous_snapshot(
        &self,
        address: &str,
    ) -> Result<Option<MarketSnapshot>, PersistenceError> {
        let index = self.index.lock().await;
        Ok(index
            .snapshots
            .iter()
            .rev()
            .filter(|s| s.address == address)
            .nth(1)
            .cloned())
    }

    async fn latest_score(
        &self,
        address: &str,
    ) -> Result<Option<CompositeScore>, PersistenceError> {
        let index = self.index.lock().await;
        Ok(index
            .scores
            .iter()
            .rev()
            .find(|s| s.address == address)
            .cloned())
    }

    async fn previous_score(
        &self,
        address: &str,
    ) -> Result<Option<CompositeScore>, PersistenceError> {
        let index = self.index.lock().await;
        Ok(index
            .scores
            .iter()
            .rev()
            .filter(|s| s.address == address)
            .nth(1)
            .cloned())
    }

    async fn exists_alert_since(
        &self,
        address: &str,
        kind: AlertKind,
        window: Duration,
    ) -> Result<bool, PersistenceError> {
        let cutoff = Utc::now() - window;
        let index = self.index.lock().await;
        Ok(index
            .alerts
            .iter()
            .any(|a| a.address == address && a.kind == kind && a.created_at >= cutoff))
    }

    async fn alerts_for(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<Alert>, PersistenceError> {
        let index = self.index.lock().await;
        Ok(index
            .alerts
            .iter()
            .rev()
            .filter(|a| a.address == address)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn purge_alerts_older_than(&self, days: i64) -> Result<usize, PersistenceError> {
        let cutoff = Utc::now() - Duration::days(days);
        let mut index = self.index.lock().await;
        let before = index.alerts.len();
        index.alerts.retain(|a| a.created_at >= cutoff);
        let removed = before - index.alerts.len();
        if removed > 0 {
            self.rewrite_file(ALERTS_FILE, &index.alerts)?;
        }
        Ok(removed)
    }
}
