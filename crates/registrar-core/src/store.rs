//! Pluggable registration storage
//!
//! The registrar talks to its backend through [`RegStore`]: get/put/delete
//! of whole per-AOR contact sets, plus a TTL hint the backend may use for
//! its own garbage collection. The default [`MemoryStore`] is an in-process
//! map; production deployments swap in a shared backend.
//!
//! Every engine-side call is wrapped in a hard timeout; an elapsed or
//! failing callback surfaces as `internal_error "Error calling registrar
//! '…' callback"` on the wire.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use ferrosip_sip_core::Aor;

use crate::types::RegContact;

/// Result of a delete operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelOutcome {
    Deleted,
    NotFound,
}

/// Backend failure reported by a store implementation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The callback did not answer within the configured deadline
    #[error("store callback timed out")]
    Timeout,
    /// The backend reported an error of its own
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Registration storage callback
#[async_trait]
pub trait RegStore: Send + Sync {
    /// All stored contacts for an AOR, stale entries included.
    async fn get(&self, app: &str, aor: &Aor) -> Result<Vec<RegContact>, StoreError>;

    /// Replace the whole contact set of an AOR. `ttl` is a retention hint;
    /// the backend may drop the entry once it elapses.
    async fn put(
        &self,
        app: &str,
        aor: &Aor,
        contacts: Vec<RegContact>,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Remove an AOR and all its contacts.
    async fn del(&self, app: &str, aor: &Aor) -> Result<DelOutcome, StoreError>;

    /// Remove every AOR of the application.
    async fn del_all(&self, app: &str) -> Result<(), StoreError>;
}

/// In-process store used as the default backend
///
/// TTL purging is lazy: an entry whose hint elapsed is dropped the next
/// time it is read.
pub struct MemoryStore {
    entries: DashMap<(String, Aor), StoredAor>,
}

struct StoredAor {
    contacts: Vec<RegContact>,
    /// Unix second past which the whole entry may be dropped.
    keep_until: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore { entries: DashMap::new() }
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

#[async_trait]
impl RegStore for MemoryStore {
    async fn get(&self, app: &str, aor: &Aor) -> Result<Vec<RegContact>, StoreError> {
        let key = (app.to_string(), aor.clone());
        if let Some(entry) = self.entries.get(&key) {
            if entry.keep_until > Self::now() {
                return Ok(entry.contacts.clone());
            }
        } else {
            return Ok(Vec::new());
        }
        // Hint elapsed: drop lazily.
        self.entries.remove(&key);
        Ok(Vec::new())
    }

    async fn put(
        &self,
        app: &str,
        aor: &Aor,
        contacts: Vec<RegContact>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.entries.insert(
            (app.to_string(), aor.clone()),
            StoredAor { contacts, keep_until: Self::now() + ttl.as_secs() },
        );
        Ok(())
    }

    async fn del(&self, app: &str, aor: &Aor) -> Result<DelOutcome, StoreError> {
        match self.entries.remove(&(app.to_string(), aor.clone())) {
            Some(_) => Ok(DelOutcome::Deleted),
            None => Ok(DelOutcome::NotFound),
        }
    }

    async fn del_all(&self, app: &str) -> Result<(), StoreError> {
        self.entries.retain(|(a, _), _| a != app);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrosip_sip_core::{Contact, Scheme, TransportInfo, Uri};

    fn contact(expire: u64) -> RegContact {
        let uri = Uri::sip("10.0.0.1").with_user("alice");
        RegContact {
            index: crate::types::ContactIndex::net_from_uri(&uri),
            contact: Contact::new(uri),
            updated: 0,
            expire,
            q: 1.0,
            call_id: "c".to_string(),
            cseq: 1,
            transport: TransportInfo::default(),
            path: Vec::new(),
            instance_id: String::new(),
            reg_id: String::new(),
            min_tmp_pos: 0,
            next_tmp_pos: 0,
        }
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        let aor = Aor::new(Scheme::Sip, "alice", "example.com");
        store
            .put("app", &aor, vec![contact(u64::MAX)], Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("app", &aor).await.unwrap().len(), 1);

        // Different app id does not see the entry.
        assert!(store.get("other", &aor).await.unwrap().is_empty());

        assert_eq!(store.del("app", &aor).await.unwrap(), DelOutcome::Deleted);
        assert_eq!(store.del("app", &aor).await.unwrap(), DelOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_memory_store_del_all_scoped_by_app() {
        let store = MemoryStore::new();
        let a = Aor::new(Scheme::Sip, "a", "example.com");
        let b = Aor::new(Scheme::Sip, "b", "example.com");
        store.put("one", &a, vec![contact(u64::MAX)], Duration::from_secs(60)).await.unwrap();
        store.put("two", &b, vec![contact(u64::MAX)], Duration::from_secs(60)).await.unwrap();

        store.del_all("one").await.unwrap();
        assert!(store.get("one", &a).await.unwrap().is_empty());
        assert_eq!(store.get("two", &b).await.unwrap().len(), 1);
    }
}
