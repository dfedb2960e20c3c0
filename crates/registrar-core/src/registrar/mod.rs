//! The registrar engine
//!
//! [`Registrar`] ties the pieces together: configuration, the storage
//! backend, the outbound flow registry and the GRUU codec. REGISTER
//! processing lives in [`engine`], the proxy-facing queries in [`lookup`].

pub mod engine;
pub mod lookup;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::warn;

use ferrosip_sip_core::{Aor, SipError, SipResult};

use crate::config::RegistrarConfig;
use crate::flow::{FlowRegistry, NoFlows};
use crate::gruu::GruuCodec;
use crate::store::{DelOutcome, MemoryStore, RegStore, StoreError};
use crate::types::RegContact;

/// One registrar application
pub struct Registrar {
    pub(crate) config: RegistrarConfig,
    pub(crate) store: Arc<dyn RegStore>,
    pub(crate) flows: Arc<dyn FlowRegistry>,
    pub(crate) gruu: GruuCodec,
}

impl Registrar {
    /// Build a registrar with the in-memory store and no flow registry.
    ///
    /// `global_id` is the process-wide identity installed at startup; its
    /// first 16 bytes key the GRUU envelope.
    pub fn new(config: RegistrarConfig, global_id: &[u8]) -> SipResult<Self> {
        Ok(Registrar {
            config,
            store: Arc::new(MemoryStore::new()),
            flows: Arc::new(NoFlows),
            gruu: GruuCodec::new(global_id)?,
        })
    }

    /// Swap in a storage backend.
    pub fn with_store(mut self, store: Arc<dyn RegStore>) -> Self {
        self.store = store;
        self
    }

    /// Swap in a flow registry.
    pub fn with_flows(mut self, flows: Arc<dyn FlowRegistry>) -> Self {
        self.flows = flows;
        self
    }

    pub fn config(&self) -> &RegistrarConfig {
        &self.config
    }

    /// Remove an AOR and all its bindings.
    pub async fn delete(&self, aor: &Aor) -> SipResult<DelOutcome> {
        self.store_del(aor).await
    }

    /// Remove every AOR of this application.
    pub async fn clear(&self) -> SipResult<()> {
        let fut = self.store.del_all(&self.config.app_id);
        self.with_deadline("del_all", fut).await
    }

    pub(crate) async fn store_get(&self, aor: &Aor) -> SipResult<Vec<RegContact>> {
        let fut = self.store.get(&self.config.app_id, aor);
        self.with_deadline("get", fut).await
    }

    pub(crate) async fn store_put(
        &self,
        aor: &Aor,
        contacts: Vec<RegContact>,
        ttl: Duration,
    ) -> SipResult<()> {
        let fut = self.store.put(&self.config.app_id, aor, contacts, ttl);
        self.with_deadline("put", fut).await
    }

    pub(crate) async fn store_del(&self, aor: &Aor) -> SipResult<DelOutcome> {
        let fut = self.store.del(&self.config.app_id, aor);
        self.with_deadline("del", fut).await
    }

    /// Run a store call under the configured deadline; timeouts and backend
    /// failures both surface as the callback internal error.
    async fn with_deadline<T>(
        &self,
        op: &str,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> SipResult<T> {
        match tokio::time::timeout(self.config.store_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(op, %err, "registrar store callback failed");
                Err(callback_error(op))
            }
            Err(_) => {
                warn!(op, "registrar store callback timed out");
                Err(callback_error(op))
            }
        }
    }
}

pub(crate) fn callback_error(op: &str) -> SipError {
    SipError::Internal(format!("Error calling registrar '{op}' callback"))
}

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Microsecond logical timestamp used as the `updated` tiebreaker.
pub(crate) fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
