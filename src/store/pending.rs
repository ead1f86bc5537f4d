//! One-time storage for PKCE verifiers keyed by the OAuth `state` value.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use time::{Duration, OffsetDateTime};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::oauth::PendingAuthorization;

#[async_trait]
pub trait PendingAuthorizationStore: Send + Sync {
    /// Registers a freshly initiated authorization.
    async fn put(&self, pending: PendingAuthorization);

    /// Removes and returns the record for `state`.
    ///
    /// At most one caller observes `Some` for a given state. Records past the
    /// TTL are dropped and reported as `None`.
    async fn take_and_delete(&self, state: &str) -> Option<PendingAuthorization>;

    /// Drops expired records and returns how many were removed.
    async fn sweep_expired(&self) -> usize;
}

#[derive(Clone)]
pub struct InMemoryPendingStore {
    records: Arc<DashMap<String, PendingAuthorization>>,
    ttl: Duration,
}

impl InMemoryPendingStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PendingAuthorizationStore for InMemoryPendingStore {
    async fn put(&self, pending: PendingAuthorization) {
        self.records.insert(pending.state.clone(), pending);
    }

    async fn take_and_delete(&self, state: &str) -> Option<PendingAuthorization> {
        let (_, pending) = self.records.remove(state)?;
        if pending.is_expired(self.ttl, OffsetDateTime::now_utc()) {
            debug!(age = ?(OffsetDateTime::now_utc() - pending.created_at), "pending authorization expired");
            return None;
        }
        Some(pending)
    }

    async fn sweep_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let before = self.records.len();
        self.records
            .retain(|_, pending| !pending.is_expired(self.ttl, now));
        before.saturating_sub(self.records.len())
    }
}

/// Runs [`PendingAuthorizationStore::sweep_expired`] every `every` until the
/// runtime shuts down.
pub fn spawn_sweeper(
    store: Arc<dyn PendingAuthorizationStore>,
    every: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = store.sweep_expired().await;
            if removed > 0 {
                debug!(removed, "swept expired pending authorizations");
            }
        }
    })
}
