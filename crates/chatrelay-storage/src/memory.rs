// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local session store.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use chatrelay_core::{AdapterType, HealthStatus, PluginAdapter, RelayError, SessionStore};

/// A [`SessionStore`] over a concurrent map with per-entry deadlines.
///
/// Only suitable when the webhook and stream phases hit the same process.
/// Every insert sweeps out expired entries, so sessions whose stream is
/// never opened do not accumulate.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: DashMap<String, (String, Instant)>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PluginAdapter for MemorySessionStore {
    fn name(&self) -> &str {
        "memory-sessions"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Session
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        self.entries.clear();
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, RelayError> {
        let now = Instant::now();
        self.entries.retain(|_, (_, deadline)| *deadline > now);
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                if slot.get().1 > now {
                    return Ok(false);
                }
                slot.insert((value.to_string(), now + ttl));
            }
            Entry::Vacant(slot) => {
                slot.insert((value.to_string(), now + ttl));
            }
        }
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, RelayError> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.1 > now => return Ok(Some(entry.0.clone())),
            Some(_) => {}
            None => return Ok(None),
        }
        self.entries
            .remove_if(key, |_, (_, deadline)| *deadline <= now);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = MemorySessionStore::new();
        let ttl = Duration::from_secs(600);
        assert!(store.insert_if_absent("stream:a", "v", ttl).await.unwrap());
        assert_eq!(store.get("stream:a").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(store.get("stream:a").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.get("stream:a").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn insert_sweeps_expired_entries() {
        let store = MemorySessionStore::new();
        let ttl = Duration::from_secs(600);
        for i in 0..1000 {
            let key = format!("stream:{i}");
            assert!(store.insert_if_absent(&key, "v", ttl).await.unwrap());
        }
        assert_eq!(store.len(), 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(store.insert_if_absent("stream:fresh", "v", ttl).await.unwrap());
        assert_eq!(store.len(), 1);
        assert!(store.get("stream:fresh").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn live_key_is_not_overwritten() {
        let store = MemorySessionStore::new();
        let ttl = Duration::from_secs(10);
        assert!(store.insert_if_absent("k", "first", ttl).await.unwrap());
        assert!(!store.insert_if_absent("k", "second", ttl).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("first"));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(store.insert_if_absent("k", "third", ttl).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("third"));
    }
}
