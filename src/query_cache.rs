//! Local cache of server-derived collections.
//!
//! Each key (documents, alerts, trends) holds one whole collection plus a
//! freshness flag. Updates are whole-value swaps of an `Arc`, so a reader
//! either sees the previous collection or the new one, never a mix.
//!
//! Concurrent refetches of the same key are last-writer-wins: whichever
//! response completes last determines the visible value. There is no
//! version check. Two workflows refreshing overlapping keys at the same
//! time race on this, and that race is accepted.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;

use crate::gateway::{ComplianceGateway, GatewayError};
use crate::models::{first_out_of_order, Alert, ComplianceTrends, Document};

// ═══════════════════════════════════════════════════════════
// Keys and values
// ═══════════════════════════════════════════════════════════

/// A named derived collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKey {
    Documents,
    Alerts,
    Trends,
}

impl CacheKey {
    pub const ALL: [CacheKey; 3] = [CacheKey::Documents, CacheKey::Alerts, CacheKey::Trends];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::Alerts => "alerts",
            Self::Trends => "trends",
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached collection. Cloning shares the underlying data.
#[derive(Debug, Clone)]
pub enum Collection {
    Documents(Arc<Vec<Document>>),
    Alerts(Arc<Vec<Alert>>),
    Trends(Arc<ComplianceTrends>),
}

/// Point-in-time view of one cache key.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    pub value: Option<Collection>,
    /// `false` until the first successful fetch, after invalidation, and
    /// after a failed refetch.
    pub fresh: bool,
    /// Number of refetches currently in flight for this key.
    pub in_flight: u32,
    pub fetched_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl CacheEntry {
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }
}

/// Typed view of one key, as handed to readers.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub value: Option<Arc<T>>,
    pub fresh: bool,
    pub loading: bool,
}

impl<T> Snapshot<T> {
    fn empty() -> Self {
        Self {
            value: None,
            fresh: false,
            loading: false,
        }
    }
}

/// Errors from cache operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    #[error("Refetch of {key} failed: {source}")]
    Refetch {
        key: CacheKey,
        #[source]
        source: GatewayError,
    },
}

/// Outcome of `refetch_all`, one entry per distinct key, in request order.
#[derive(Debug, Clone)]
pub struct RefetchReport {
    pub outcomes: Vec<(CacheKey, Result<(), CacheError>)>,
}

impl RefetchReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, r)| r.is_ok())
    }

    pub fn failed_keys(&self) -> Vec<CacheKey> {
        self.outcomes
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(k, _)| *k)
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════
// QueryCache
// ═══════════════════════════════════════════════════════════

/// Keyed store of server-derived collections.
///
/// The lock is only held for snapshot reads and value swaps, never across
/// a network call.
pub struct QueryCache {
    gateway: Arc<dyn ComplianceGateway>,
    trend_days: u32,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl QueryCache {
    pub fn new(gateway: Arc<dyn ComplianceGateway>, trend_days: u32) -> Self {
        Self {
            gateway,
            trend_days,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn trend_days(&self) -> u32 {
        self.trend_days
    }

    // ── Read path ───────────────────────────────────────

    /// Current value and freshness for `key`. Never fetches.
    pub fn get(&self, key: CacheKey) -> CacheEntry {
        self.read_entries().get(&key).cloned().unwrap_or_default()
    }

    pub fn is_fresh(&self, key: CacheKey) -> bool {
        self.get(key).fresh
    }

    pub fn documents(&self) -> Snapshot<Vec<Document>> {
        let entry = self.get(CacheKey::Documents);
        let mut snap = snapshot_of(&entry);
        if let Some(Collection::Documents(docs)) = entry.value {
            snap.value = Some(docs);
        }
        snap
    }

    pub fn alerts(&self) -> Snapshot<Vec<Alert>> {
        let entry = self.get(CacheKey::Alerts);
        let mut snap = snapshot_of(&entry);
        if let Some(Collection::Alerts(alerts)) = entry.value {
            snap.value = Some(alerts);
        }
        snap
    }

    pub fn trends(&self) -> Snapshot<ComplianceTrends> {
        let entry = self.get(CacheKey::Trends);
        let mut snap = snapshot_of(&entry);
        if let Some(Collection::Trends(trends)) = entry.value {
            snap.value = Some(trends);
        }
        snap
    }

    // ── Invalidation ────────────────────────────────────

    /// Mark `key` stale. Keeps the value; does not fetch.
    pub fn invalidate(&self, key: CacheKey) {
        let mut entries = self.write_entries();
        entries.entry(key).or_default().fresh = false;
        tracing::debug!(%key, "Cache key invalidated");
    }

    pub fn invalidate_all(&self, keys: &[CacheKey]) {
        for key in keys {
            self.invalidate(*key);
        }
    }

    // ── Refetch ─────────────────────────────────────────

    /// Fetch `key` through the gateway and swap the stored value.
    ///
    /// On failure the previous value stays visible and the key stays stale.
    pub async fn refetch(&self, key: CacheKey) -> Result<(), CacheError> {
        let loading = InFlight::start(self, key);

        let result = self.fetch(key).await;

        let outcome = {
            let mut entries = self.write_entries();
            let entry = entries.entry(key).or_default();
            match result {
                Ok(value) => {
                    entry.value = Some(value);
                    entry.fresh = true;
                    entry.fetched_at = Some(Utc::now());
                    entry.last_error = None;
                    tracing::debug!(%key, "Cache key refreshed");
                    Ok(())
                }
                Err(source) => {
                    entry.fresh = false;
                    entry.last_error = Some(source.to_string());
                    tracing::warn!(%key, error = %source, "Cache refetch failed, keeping last value");
                    Err(CacheError::Refetch { key, source })
                }
            }
        };

        drop(loading);
        outcome
    }

    /// Refetch every distinct key concurrently.
    ///
    /// Resolves only after each key has settled, success or failure.
    pub async fn refetch_all(&self, keys: &[CacheKey]) -> RefetchReport {
        let mut distinct: Vec<CacheKey> = Vec::with_capacity(keys.len());
        for key in keys {
            if !distinct.contains(key) {
                distinct.push(*key);
            }
        }

        let results = join_all(distinct.iter().map(|key| self.refetch(*key))).await;

        RefetchReport {
            outcomes: distinct.into_iter().zip(results).collect(),
        }
    }

    async fn fetch(&self, key: CacheKey) -> Result<Collection, GatewayError> {
        match key {
            CacheKey::Documents => {
                let docs = self.gateway.fetch_documents().await?;
                Ok(Collection::Documents(Arc::new(docs)))
            }
            CacheKey::Alerts => {
                let alerts = self.gateway.fetch_alerts().await?;
                Ok(Collection::Alerts(Arc::new(alerts)))
            }
            CacheKey::Trends => {
                let trends = self.gateway.fetch_compliance_trends(self.trend_days).await?;
                if let Some(idx) = first_out_of_order(&trends.trends) {
                    tracing::warn!(
                        index = idx,
                        date = %trends.trends[idx].date,
                        "Compliance trend series is not chronological; stored as received"
                    );
                }
                Ok(Collection::Trends(Arc::new(trends)))
            }
        }
    }

    // ── Internal ────────────────────────────────────────

    // Entries are replaced whole, so a poisoned lock still guards
    // consistent data.
    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ═══════════════════════════════════════════════════════════
// InFlight — RAII loading marker
// ═══════════════════════════════════════════════════════════

/// Counts one refetch of `key` as in flight until dropped, including when
/// the refetch future is dropped mid-fetch.
struct InFlight<'a> {
    cache: &'a QueryCache,
    key: CacheKey,
}

impl<'a> InFlight<'a> {
    fn start(cache: &'a QueryCache, key: CacheKey) -> Self {
        cache.write_entries().entry(key).or_default().in_flight += 1;
        Self { cache, key }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut entries = self.cache.write_entries();
        let entry = entries.entry(self.key).or_default();
        entry.in_flight = entry.in_flight.saturating_sub(1);
    }
}

fn snapshot_of<T>(entry: &CacheEntry) -> Snapshot<T> {
    Snapshot {
        fresh: entry.fresh,
        loading: entry.is_loading(),
        ..Snapshot::empty()
    }
}
