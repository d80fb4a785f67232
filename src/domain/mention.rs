//! Discovery Sources and Mentions
//!
//! A monitored source is one place the scanner polls for token mentions
//! (a chat group, a feed, a code repository, a social account). Sources own
//! their scan interval, keyword/regex filters and error bookkeeping; a source
//! that keeps failing deactivates itself.

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Consecutive scan failures before a source auto-deactivates.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Minimum allowed scan interval.
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_secs(10);
/// Maximum allowed scan interval.
pub const MAX_SCAN_INTERVAL: Duration = Duration::from_secs(86_400);

#[derive(Debug, Error)]
pub enum SourceConfigError {
    #[error("Scan interval must be between 10 seconds and 24 hours, got {0:?}")]
    IntervalOutOfRange(Duration),
    #[error("Invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("Source identifier must not be empty")]
    EmptyIdentifier,
}

/// Kind of discovery source. Kinds outside the known set are carried
/// through as `Other` and yield empty scans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceKind {
    Chat,
    Feed,
    Repository,
    Social,
    Other(String),
}

impl From<String> for SourceKind {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "chat" => SourceKind::Chat,
            "feed" => SourceKind::Feed,
            "repository" => SourceKind::Repository,
            "social" => SourceKind::Social,
            _ => SourceKind::Other(s),
        }
    }
}

impl From<SourceKind> for String {
    fn from(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Chat => "chat".to_string(),
            SourceKind::Feed => "feed".to_string(),
            SourceKind::Repository => "repository".to_string(),
            SourceKind::Social => "social".to_string(),
            SourceKind::Other(s) => s,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

/// One item surfaced by scanning a source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    /// Identifier of the source that produced the mention
    pub source: String,
    /// Provider-side item id; (source, item_id) is the dedup key
    pub item_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub origin_url: String,
    pub attachments: Vec<String>,
}

impl Mention {
    /// Dedup key for idempotent re-scans.
    pub fn dedup_key(&self) -> (String, String) {
        (self.source.clone(), self.item_id.clone())
    }
}

/// Compiled keyword/regex filter for mentions.
///
/// A mention passes when it matches at least one keyword (case-insensitive
/// substring) or one pattern. With nothing configured, everything passes.
#[derive(Debug, Clone)]
pub struct MentionFilter {
    keywords: Vec<String>,
    patterns: Vec<Regex>,
}

impl MentionFilter {
    pub fn compile(keywords: &[String], patterns: &[String]) -> Result<Self, SourceConfigError> {
        let compiled = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| SourceConfigError::InvalidPattern {
                        pattern: p.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            patterns: compiled,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.patterns.is_empty()
    }

    pub fn matches(&self, text: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        let lowered = text.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k))
            || self.patterns.iter().any(|p| p.is_match(text))
    }
}

/// A discovery source under periodic scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredSource {
    pub kind: SourceKind,
    /// Group id, feed URL, repo slug or account handle
    pub identifier: String,
    pub name: Option<String>,
    pub active: bool,
    /// Seconds between scans, bounded to [10s, 24h]
    pub scan_interval_secs: u64,
    pub error_count: u32,
    pub last_error: Option<String>,
    pub last_scanned_at: Option<DateTime<Utc>>,
    /// Cursor of the newest item already seen, provider-specific
    pub cursor: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl MonitoredSource {
    pub fn new(kind: SourceKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            name: None,
            active: true,
            scan_interval_secs: 60,
            error_count: 0,
            last_error: None,
            last_scanned_at: None,
            cursor: None,
            keywords: Vec::new(),
            patterns: Vec::new(),
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    /// Reject bad configuration before the source reaches the scan loop.
    pub fn validate(&self) -> Result<(), SourceConfigError> {
        if self.identifier.trim().is_empty() {
            return Err(SourceConfigError::EmptyIdentifier);
        }
        let interval = self.scan_interval();
        if interval < MIN_SCAN_INTERVAL || interval > MAX_SCAN_INTERVAL {
            return Err(SourceConfigError::IntervalOutOfRange(interval));
        }
        // Compiling the filter surfaces bad patterns at config time
        self.filter().map(|_| ())
    }

    pub fn filter(&self) -> Result<MentionFilter, SourceConfigError> {
        MentionFilter::compile(&self.keywords, &self.patterns)
    }

    /// Whether the source is due for a scan.
    pub fn should_scan(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        match self.last_scanned_at {
            None => true,
            Some(last) => {
                (now - last).num_seconds() >= self.scan_interval_secs as i64
            }
        }
    }

    /// A successful scan resets the error count.
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.last_scanned_at = Some(now);
        self.error_count = 0;
        self.last_error = None;
    }

    /// A failed scan increments the error count; past the threshold the
    /// source deactivates itself.
    pub fn record_failure(&mut self, now: DateTime<Utc>, error: impl Into<String>) {
        self.last_scanned_at = Some(now);
        self.error_count += 1;
        self.last_error = Some(error.into());
        if self.error_count >= MAX_CONSECUTIVE_ERRORS {
            self.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as TimeDelta;

    fn source() -> MonitoredSource {
        MonitoredSource::new(SourceKind::Feed, "https://example.com/feed.json")
    }

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(SourceKind::from("chat".to_string()), SourceKind::Chat);
        assert_eq!(
            SourceKind::from("carrier-pigeon".to_string()),
            SourceKind::Other("carrier-pigeon".to_string())
        );
        assert_eq!(String::from(SourceKind::Repository), "repository");
    }

    #[test]
    fn test_interval_validation() {
        let mut s = source();
        s.scan_interval_secs = 5;
        assert!(s.validate().is_err());

        s.scan_interval_secs = 86_401;
        assert!(s.validate().is_err());

        s.scan_interval_secs = 60;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_empty_identifier_rejected() {
        let mut s = source();
        s.identifier = "  ".to_string();
        assert!(matches!(
            s.validate(),
            Err(SourceConfigError::EmptyIdentifier)
        ));
    }

    #[test]
    fn test_bad_pattern_rejected_at_config_time() {
        let mut s = source();
        s.patterns = vec!["(unclosed".to_string()];
        assert!(matches!(
            s.validate(),
            Err(SourceConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_empty_filter_passes_everything() {
        let filter = MentionFilter::compile(&[], &[]).unwrap();
        assert!(filter.matches("anything at all"));
    }

    #[test]
    fn test_keyword_filter_case_insensitive() {
        let filter =
            MentionFilter::compile(&["Solana".to_string()], &[]).unwrap();
        assert!(filter.matches("new SOLANA gem just dropped"));
        assert!(!filter.matches("ethereum only here"));
    }

    #[test]
    fn test_regex_filter() {
        let filter = MentionFilter::compile(&[], &[r"\$[A-Z]{2,6}\b".to_string()]).unwrap();
        assert!(filter.matches("aping into $BONK today"));
        assert!(!filter.matches("no cashtags here"));
    }

    #[test]
    fn test_should_scan_honors_interval() {
        let mut s = source();
        s.scan_interval_secs = 60;
        let now = Utc::now();

        assert!(s.should_scan(now)); // never scanned
        s.record_success(now);
        assert!(!s.should_scan(now + TimeDelta::seconds(30)));
        assert!(s.should_scan(now + TimeDelta::seconds(61)));
    }

    #[test]
    fn test_error_count_resets_on_success() {
        let mut s = source();
        let now = Utc::now();
        s.record_failure(now, "boom");
        s.record_failure(now, "boom");
        assert_eq!(s.error_count, 2);

        s.record_success(now);
        assert_eq!(s.error_count, 0);
        assert!(s.last_error.is_none());
    }

    #[test]
    fn test_auto_deactivation_after_threshold() {
        let mut s = source();
        let now = Utc::now();
        for _ in 0..MAX_CONSECUTIVE_ERRORS {
            s.record_failure(now, "unreachable");
        }
        assert!(!s.active);
        assert!(!s.should_scan(now + TimeDelta::seconds(3600)));
    }

    #[test]
    fn test_inactive_source_never_scans() {
        let mut s = source();
        s.active = false;
        assert!(!s.should_scan(Utc::now()));
    }
}
