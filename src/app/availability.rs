use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::http::Transport;
use crate::store::Store;

use super::deadline::{Raced, race};
use super::request::response_code;
use super::source::SourceSelection;

// Two months, in milliseconds.
pub(crate) const FRESHNESS_WINDOW_MS: i64 = 5_184_000_000;
pub(crate) const PROBE_QUERY: &str = "test";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AvailabilityRecord {
    #[serde(rename = "isAvailable")]
    pub(crate) is_available: bool,
    #[serde(rename = "checkedAt")]
    pub(crate) checked_at_ms: i64,
}

impl AvailabilityRecord {
    pub(crate) fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms
            .checked_sub(self.checked_at_ms)
            .is_some_and(|age| age < FRESHNESS_WINDOW_MS)
    }
}

pub(crate) fn cache_key(source: &SourceSelection) -> String {
    format!(
        "site_status:{}:{}",
        source.code(),
        source.custom_url().unwrap_or("")
    )
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) struct AvailabilityCache<'a> {
    store: &'a Store,
}

impl<'a> AvailabilityCache<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self { store }
    }

    // Stale and unreadable entries read as absent; they stay in the store
    // until the next `put` replaces them.
    pub(crate) fn get(&self, key: &str, now_ms: i64) -> Option<AvailabilityRecord> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, "availability cache read failed: {err:#}");
                return None;
            }
        };
        let record = match serde_json::from_str::<AvailabilityRecord>(&raw) {
            Ok(record) => record,
            Err(err) => {
                warn!(key, "ignoring malformed availability entry: {err}");
                return None;
            }
        };
        if !record.is_fresh(now_ms) {
            debug!(key, checked_at_ms = record.checked_at_ms, "availability entry is stale");
            return None;
        }
        Some(record)
    }

    pub(crate) fn put(&self, key: &str, record: &AvailabilityRecord) -> Result<()> {
        let payload =
            serde_json::to_string(record).context("failed to encode availability record")?;
        self.store.set(key, &payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProbeOutcome {
    Reachable,
    Unreachable,
    TimedOut,
}

impl ProbeOutcome {
    pub(crate) fn is_available(self) -> bool {
        matches!(self, Self::Reachable)
    }
}

pub(crate) fn probe_source(
    transport: Arc<dyn Transport>,
    source: &SourceSelection,
    limit: Duration,
) -> ProbeOutcome {
    let target = source.clone();
    info!(source = %source, "probing source availability");
    let outcome = match race("availability probe", limit, move || {
        check_reachable(transport.as_ref(), &target)
    }) {
        Raced::Settled(true) => ProbeOutcome::Reachable,
        Raced::Settled(false) | Raced::Lost => ProbeOutcome::Unreachable,
        Raced::TimedOut => ProbeOutcome::TimedOut,
    };
    debug!(source = %source, ?outcome, "probe finished");
    outcome
}

fn check_reachable(transport: &dyn Transport, source: &SourceSelection) -> bool {
    let query = vec![
        ("wd".to_string(), PROBE_QUERY.to_string()),
        source.query_params(),
    ];
    let body = match transport.get_text("/api/search", &query) {
        Ok(body) => body,
        Err(err) => {
            debug!(source = %source, "probe request failed: {err}");
            return false;
        }
    };
    let Ok(parsed) = serde_json::from_str::<Value>(&body) else {
        return false;
    };
    let rejected = response_code(&parsed) == Some(400);
    !rejected && parsed.get("list").is_some_and(Value::is_array)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusOrigin {
    Cached,
    Probed,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SourceStatus {
    pub(crate) available: bool,
    pub(crate) origin: StatusOrigin,
}

pub(crate) struct AvailabilityChecker<'a> {
    cache: AvailabilityCache<'a>,
    transport: Arc<dyn Transport>,
    probe_timeout: Duration,
}

impl<'a> AvailabilityChecker<'a> {
    pub(crate) fn new(store: &'a Store, transport: Arc<dyn Transport>, probe_timeout: Duration) -> Self {
        Self {
            cache: AvailabilityCache::new(store),
            transport,
            probe_timeout,
        }
    }

    pub(crate) fn status(&self, source: &SourceSelection) -> SourceStatus {
        match self.cached(source) {
            Some(status) => status,
            None => self.status_refreshed(source),
        }
    }

    pub(crate) fn cached(&self, source: &SourceSelection) -> Option<SourceStatus> {
        let record = self.cache.get(&cache_key(source), now_ms())?;
        Some(SourceStatus {
            available: record.is_available,
            origin: StatusOrigin::Cached,
        })
    }

    // Probes regardless of the cache. A timeout is cached as unavailable for
    // the full freshness window, same as a genuine negative.
    pub(crate) fn status_refreshed(&self, source: &SourceSelection) -> SourceStatus {
        let outcome = probe_source(Arc::clone(&self.transport), source, self.probe_timeout);
        self.record(source, outcome)
    }

    pub(crate) fn record(&self, source: &SourceSelection, outcome: ProbeOutcome) -> SourceStatus {
        let record = AvailabilityRecord {
            is_available: outcome.is_available(),
            checked_at_ms: now_ms(),
        };
        if let Err(err) = self.cache.put(&cache_key(source), &record) {
            warn!(source = %source, "failed to cache availability: {err:#}");
        }
        SourceStatus {
            available: record.is_available,
            origin: match outcome {
                ProbeOutcome::TimedOut => StatusOrigin::TimedOut,
                ProbeOutcome::Reachable | ProbeOutcome::Unreachable => StatusOrigin::Probed,
            },
        }
    }
}
