//! Cached lookup table and its freshness
//!
//! The cache holds one immutable [`Mapping`] behind an `Arc`. A refresh swaps
//! in a whole new mapping; nothing is ever merged into the old one, so a
//! reader holding a snapshot never sees a half-built table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::mapping::Mapping;

/// Freshness of the cached mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// Never refreshed, invalidated, or older than the TTL
    Stale,
    /// Refreshed less than one TTL ago
    Fresh,
}

/// Current mapping plus the instant it was last refreshed
#[derive(Debug, Clone, Default)]
pub struct MappingCache {
    mapping: Arc<Mapping>,
    /// `None` means infinitely stale
    refreshed_at: Option<Instant>,
}

impl MappingCache {
    /// An empty, stale cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Freshness at `now` for the given TTL
    pub fn state(&self, now: Instant, ttl: Duration) -> CacheState {
        match self.age(now) {
            Some(age) if age < ttl => CacheState::Fresh,
            _ => CacheState::Stale,
        }
    }

    /// Time since the last refresh, `None` if never refreshed
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.refreshed_at.map(|at| now.saturating_duration_since(at))
    }

    /// Instant of the last successful refresh
    pub fn refreshed_at(&self) -> Option<Instant> {
        self.refreshed_at
    }

    /// Snapshot of the current mapping
    pub fn snapshot(&self) -> Arc<Mapping> {
        Arc::clone(&self.mapping)
    }

    /// Borrow the current mapping
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Install a freshly built mapping refreshed at `at`
    pub fn install(&mut self, mapping: Mapping, at: Instant) {
        self.mapping = Arc::new(mapping);
        self.refreshed_at = Some(at);
    }

    /// Swap the mapping, keeping the refresh instant
    pub fn replace(&mut self, mapping: Mapping) {
        self.mapping = Arc::new(mapping);
    }

    /// Mark stale so the next batch refreshes; the mapping stays readable
    pub fn invalidate(&mut self) {
        self.refreshed_at = None;
    }
}
