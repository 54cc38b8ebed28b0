//! Role-specific projections of the store. Recomputed on every query; they
//! hold no state of their own and cannot drift from the records.

use serde::Serialize;
use uuid::Uuid;

use crate::models::pickup::{PickupRequest, PickupStatus};
use crate::store::PickupStore;

pub fn for_customer(store: &PickupStore, customer_id: Uuid) -> Vec<PickupRequest> {
    store
        .list_all()
        .into_iter()
        .filter(|pickup| pickup.customer_id == customer_id)
        .collect()
}

/// Last `limit` of the customer's pickups by insertion order, newest first.
pub fn recent_for_customer(
    store: &PickupStore,
    customer_id: Uuid,
    limit: usize,
) -> Vec<PickupRequest> {
    let mut own = for_customer(store, customer_id);
    own.reverse();
    own.truncate(limit);
    own
}

/// Everything a partner can act on: unclaimed pickups plus the ones this
/// partner has already claimed, at any stage.
pub fn for_partner(store: &PickupStore, partner_id: Uuid) -> Vec<PickupRequest> {
    store
        .list_all()
        .into_iter()
        .filter(|pickup| {
            pickup.status() == PickupStatus::Pending || pickup.partner_id() == Some(partner_id)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartnerDashboard {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

pub fn partner_dashboard(store: &PickupStore, partner_id: Uuid) -> PartnerDashboard {
    let mut dashboard = PartnerDashboard {
        pending: 0,
        in_progress: 0,
        completed: 0,
    };

    for pickup in store.list_all() {
        let mine = pickup.partner_id() == Some(partner_id);
        match pickup.status() {
            PickupStatus::Pending => dashboard.pending += 1,
            PickupStatus::Accepted | PickupStatus::InProcess | PickupStatus::PendingApproval
                if mine =>
            {
                dashboard.in_progress += 1
            }
            PickupStatus::Completed if mine => dashboard.completed += 1,
            _ => {}
        }
    }

    dashboard
}
