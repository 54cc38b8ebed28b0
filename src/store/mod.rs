pub mod persistence;

use std::sync::{Mutex, RwLock};

use chrono::Utc;
use dashmap::DashMap;
use tracing::error;
use uuid::Uuid;

use crate::error::{EngineError, StoreError};
use crate::models::pickup::{PickupDraft, PickupPhase, PickupRequest};
use crate::store::persistence::Persistence;

/// Canonical collection of pickup records. Every mutation goes through
/// `update`, so the `updated_at` stamp and the persistence snapshot cannot
/// be bypassed.
pub struct PickupStore {
    records: DashMap<Uuid, PickupRequest>,
    insertion_order: RwLock<Vec<Uuid>>,
    backend: Box<dyn Persistence<PickupRequest>>,
    flush_lock: Mutex<()>,
}

impl PickupStore {
    pub fn open(backend: Box<dyn Persistence<PickupRequest>>) -> Result<Self, StoreError> {
        let loaded = backend.load()?;
        let records = DashMap::with_capacity(loaded.len());
        let mut order = Vec::with_capacity(loaded.len());

        for record in loaded {
            order.push(record.id);
            records.insert(record.id, record);
        }

        Ok(Self {
            records,
            insertion_order: RwLock::new(order),
            backend,
            flush_lock: Mutex::new(()),
        })
    }

    /// Stamps id, timestamps and the pending phase onto the draft and
    /// appends it. Insertion order is what `list_all` returns.
    pub fn insert(&self, draft: PickupDraft) -> PickupRequest {
        let now = Utc::now();
        let record = PickupRequest {
            id: Uuid::new_v4(),
            customer_id: draft.customer_id,
            customer_name: draft.customer_name,
            customer_phone: draft.customer_phone,
            address: draft.address,
            map_link: draft.map_link,
            pickup_date: draft.pickup_date,
            time_slot: draft.time_slot,
            phase: PickupPhase::Pending,
            created_at: now,
            updated_at: now,
        };

        self.records.insert(record.id, record.clone());
        self.insertion_order
            .write()
            .expect("insertion order lock poisoned")
            .push(record.id);
        self.flush();

        record
    }

    pub fn get(&self, id: Uuid) -> Option<PickupRequest> {
        self.records.get(&id).map(|entry| entry.value().clone())
    }

    pub fn list_all(&self) -> Vec<PickupRequest> {
        let order = self
            .insertion_order
            .read()
            .expect("insertion order lock poisoned");

        order
            .iter()
            .filter_map(|id| self.records.get(id).map(|entry| entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Applies `transition` to the record under its entry guard; two racing
    /// writers on one id serialize here, and the loser evaluates against the
    /// winner's result. The closure is pure, so a rejected transition leaves
    /// the stored record untouched.
    pub fn update<F>(&self, id: Uuid, transition: F) -> Result<PickupRequest, EngineError>
    where
        F: FnOnce(&PickupRequest) -> Result<PickupRequest, EngineError>,
    {
        let updated = {
            let mut entry = self.records.get_mut(&id).ok_or(EngineError::NotFound(id))?;
            let mut next = transition(entry.value())?;
            next.updated_at = Utc::now();
            *entry.value_mut() = next.clone();
            next
        };

        self.flush();
        Ok(updated)
    }

    /// Persistence is write-through but best-effort: the in-memory commit is
    /// the source of truth and a failed disk write only logs.
    fn flush(&self) {
        let _guard = self.flush_lock.lock().expect("flush lock poisoned");
        let snapshot = self.list_all();
        if let Err(err) = self.backend.save(&snapshot) {
            error!(error = %err, "failed to persist pickup snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::PickupStore;
    use crate::error::EngineError;
    use crate::models::pickup::{PickupDraft, PickupPhase};
    use crate::store::persistence::{InMemory, JsonFile};

    fn draft(customer: u128) -> PickupDraft {
        PickupDraft {
            customer_id: Uuid::from_u128(customer),
            customer_name: "Asha".to_string(),
            customer_phone: "9876543210".to_string(),
            address: "123 Main St".to_string(),
            map_link: None,
            pickup_date: "2025-06-01".parse().unwrap(),
            time_slot: "9:00 AM - 10:00 AM".to_string(),
        }
    }

    fn store() -> PickupStore {
        PickupStore::open(Box::new(InMemory)).unwrap()
    }

    #[test]
    fn insert_stamps_pending_and_fresh_ids() {
        let store = store();

        let first = store.insert(draft(1));
        let second = store.insert(draft(1));

        assert_eq!(first.phase, PickupPhase::Pending);
        assert_eq!(first.created_at, first.updated_at);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn list_all_preserves_insertion_order() {
        let store = store();

        let ids: Vec<Uuid> = (0..4).map(|i| store.insert(draft(i)).id).collect();
        let listed: Vec<Uuid> = store.list_all().iter().map(|p| p.id).collect();

        assert_eq!(listed, ids);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let store = store();
        let missing = Uuid::from_u128(99);

        let result = store.update(missing, |record| Ok(record.clone()));
        assert_eq!(result.unwrap_err(), EngineError::NotFound(missing));
    }

    #[test]
    fn update_refreshes_updated_at() {
        let store = store();
        let record = store.insert(draft(1));

        std::thread::sleep(std::time::Duration::from_millis(2));
        let updated = store.update(record.id, |r| Ok(r.clone())).unwrap();

        assert!(updated.updated_at > record.updated_at);
        assert_eq!(updated.created_at, record.created_at);
    }

    #[test]
    fn rejected_transition_leaves_the_record_untouched() {
        let store = store();
        let record = store.insert(draft(1));

        let result = store.update(record.id, |r| {
            Err(EngineError::InvalidTransition {
                action: "accept",
                status: r.status(),
            })
        });

        assert!(result.is_err());
        assert_eq!(store.get(record.id).unwrap(), record);
    }

    #[test]
    fn snapshot_survives_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pickups.json");

        let first = PickupStore::open(Box::new(JsonFile::new(path.clone()))).unwrap();
        let a = first.insert(draft(1));
        let b = first.insert(draft(2));
        drop(first);

        let reopened = PickupStore::open(Box::new(JsonFile::new(path))).unwrap();
        let listed: Vec<Uuid> = reopened.list_all().iter().map(|p| p.id).collect();
        assert_eq!(listed, vec![a.id, b.id]);
    }
}
