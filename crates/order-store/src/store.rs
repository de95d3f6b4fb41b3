//! Services cache and order log with optional file persistence.

use crate::error::OrderStoreError;
use crate::types::{CacheState, OrderRecord};
use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

enum Backend {
    File(PathBuf),
    Memory,
}

/// Process-wide cache of the provider's service list plus an append-only
/// order log.
///
/// State lives in memory; with a file backend every mutation is also
/// written through to a JSON file so orders survive restarts. A missing or
/// corrupt file never fails startup, it just yields an empty state.
#[derive(Clone)]
pub struct OrderStore {
    state: Arc<RwLock<CacheState>>,
    backend: Arc<Backend>,
}

impl OrderStore {
    /// Open a file-backed store, loading any existing state.
    pub async fn open(path: PathBuf) -> Self {
        let state = match Self::load_state(&path).await {
            Ok(Some(state)) => {
                info!(
                    path = %path.display(),
                    orders = state.orders.len(),
                    "loaded order store"
                );
                state
            }
            Ok(None) => {
                info!(path = %path.display(), "no existing order store, starting empty");
                CacheState::default()
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "order store unreadable, starting empty"
                );
                CacheState::default()
            }
        };

        Self {
            state: Arc::new(RwLock::new(state)),
            backend: Arc::new(Backend::File(path)),
        }
    }

    /// In-memory store with no persistence.
    pub fn memory() -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheState::default())),
            backend: Arc::new(Backend::Memory),
        }
    }

    async fn load_state(path: &Path) -> Result<Option<CacheState>, OrderStoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read(path).await?;
        let state = serde_json::from_slice(&raw)?;
        Ok(Some(state))
    }

    /// The cached service list, if present and not expired.
    pub async fn cached_services(&self) -> Option<Value> {
        let state = self.state.read().await;
        match (&state.services, state.services_expires_at) {
            (Some(services), Some(expires_at)) if Utc::now() < expires_at => {
                Some(services.clone())
            }
            _ => None,
        }
    }

    /// Cache a service list for `ttl`.
    pub async fn put_services(&self, services: Value, ttl: Duration) -> Result<(), OrderStoreError> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        let mut state = self.state.write().await;
        state.services = Some(services);
        state.services_expires_at = Some(Utc::now() + ttl);
        let snapshot = state.clone();
        drop(state);
        self.persist(&snapshot).await
    }

    /// Append an order to the log.
    pub async fn add_order(&self, record: OrderRecord) -> Result<(), OrderStoreError> {
        let mut state = self.state.write().await;
        state.orders.push(record);
        let snapshot = state.clone();
        drop(state);
        self.persist(&snapshot).await
    }

    /// All recorded orders, oldest first.
    pub async fn orders(&self) -> Vec<OrderRecord> {
        self.state.read().await.orders.clone()
    }

    pub async fn find_order(&self, id: &str) -> Option<OrderRecord> {
        self.state
            .read()
            .await
            .orders
            .iter()
            .find(|o| o.id == id)
            .cloned()
    }

    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Write the state through to disk, atomically (temp file + rename).
    async fn persist(&self, state: &CacheState) -> Result<(), OrderStoreError> {
        let path = match self.backend.as_ref() {
            Backend::File(path) => path,
            Backend::Memory => {
                debug!("memory store: persist is a no-op");
                return Ok(());
            }
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_vec_pretty(state)?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, path).await?;

        debug!(path = %path.display(), bytes = data.len(), "order store persisted");
        Ok(())
    }
}
