use std::sync::Arc;

use tokio::sync::broadcast;

use crate::auth::{AuthSession, SessionStore};
use crate::engine::LifecycleEngine;
use crate::error::StoreError;
use crate::models::pickup::PickupRequest;
use crate::observability::metrics::Metrics;
use crate::store::persistence::{InMemory, Persistence};
use crate::store::PickupStore;

pub struct AppState {
    pub sessions: SessionStore,
    pub store: Arc<PickupStore>,
    pub engine: LifecycleEngine,
    pub pickup_events_tx: broadcast::Sender<PickupRequest>,
    pub metrics: Metrics,
    pub recent_limit: usize,
}

impl AppState {
    pub fn open(
        verification_code: String,
        recent_limit: usize,
        event_buffer_size: usize,
        pickup_backend: Box<dyn Persistence<PickupRequest>>,
        session_backend: Box<dyn Persistence<AuthSession>>,
    ) -> Result<Self, StoreError> {
        let metrics = Metrics::new();
        let (pickup_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        let store = Arc::new(PickupStore::open(pickup_backend)?);
        metrics.pickups_in_store.set(store.len() as i64);

        let sessions = SessionStore::open(verification_code, session_backend, metrics.clone())?;
        let engine = LifecycleEngine::new(store.clone(), pickup_events_tx.clone(), metrics.clone());

        Ok(Self {
            sessions,
            store,
            engine,
            pickup_events_tx,
            metrics,
            recent_limit,
        })
    }

    /// Ephemeral state with defaults; the integration harness starts here.
    pub fn in_memory(verification_code: &str) -> Self {
        Self::open(
            verification_code.to_string(),
            3,
            1024,
            Box::new(InMemory),
            Box::new(InMemory),
        )
        .expect("in-memory backends cannot fail to load")
    }
}
