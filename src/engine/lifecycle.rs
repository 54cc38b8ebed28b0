use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::code::generate_pickup_code;
use crate::error::EngineError;
use crate::models::pickup::{
    PartnerAssignment, PickupDraft, PickupItem, PickupPhase, PickupRequest, Receipt,
};
use crate::models::user::{Identity, Role};
use crate::observability::metrics::Metrics;
use crate::store::PickupStore;

/// Allowed drift between a submitted total and the recomputed item sum.
const AMOUNT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct NewPickup {
    pub address: String,
    pub map_link: Option<String>,
    pub pickup_date: NaiveDate,
    pub time_slot: String,
}

/// The state machine over pickup records:
///
/// ```text
/// pending -> accepted -> in-process -> pending-approval -> completed
/// ```
///
/// Transitions run inside the store's per-id update, so racing actors
/// serialize and exactly one of two concurrent accepts wins. Every
/// operation takes the authenticated actor and refuses callers that are
/// not the party the transition belongs to.
pub struct LifecycleEngine {
    store: Arc<PickupStore>,
    events_tx: broadcast::Sender<PickupRequest>,
    metrics: Metrics,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<PickupStore>,
        events_tx: broadcast::Sender<PickupRequest>,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            events_tx,
            metrics,
        }
    }

    /// Schedules a pickup for the acting customer. The customer fields come
    /// from the authenticated identity, not the payload, so a caller cannot
    /// file requests on someone else's behalf.
    pub fn create(&self, actor: &Identity, input: NewPickup) -> Result<PickupRequest, EngineError> {
        let result = self.try_create(actor, input);
        self.finish("create", result)
    }

    pub fn accept(&self, actor: &Identity, pickup_id: Uuid) -> Result<PickupRequest, EngineError> {
        let result = self.try_accept(actor, pickup_id);
        self.finish("accept", result)
    }

    pub fn start(
        &self,
        actor: &Identity,
        pickup_id: Uuid,
        entered_code: &str,
    ) -> Result<PickupRequest, EngineError> {
        let result = self.try_start(actor, pickup_id, entered_code);
        self.finish("start", result)
    }

    pub fn submit_items(
        &self,
        actor: &Identity,
        pickup_id: Uuid,
        items: Vec<PickupItem>,
        total_amount: f64,
    ) -> Result<PickupRequest, EngineError> {
        let result = self.try_submit_items(actor, pickup_id, items, total_amount);
        self.finish("submit_items", result)
    }

    pub fn approve(&self, actor: &Identity, pickup_id: Uuid) -> Result<PickupRequest, EngineError> {
        let result = self.try_approve(actor, pickup_id);
        self.finish("approve", result)
    }

    fn try_create(&self, actor: &Identity, input: NewPickup) -> Result<PickupRequest, EngineError> {
        if actor.role != Role::Customer {
            return Err(EngineError::Unauthorized);
        }

        let address = input.address.trim();
        if address.is_empty() {
            return Err(EngineError::InvalidInput("address cannot be empty".to_string()));
        }
        let time_slot = input.time_slot.trim();
        if time_slot.is_empty() {
            return Err(EngineError::InvalidInput(
                "time slot cannot be empty".to_string(),
            ));
        }

        let record = self.store.insert(PickupDraft {
            customer_id: actor.id,
            customer_name: actor.display_name().to_string(),
            customer_phone: actor.phone.clone(),
            address: address.to_string(),
            map_link: input.map_link.filter(|link| !link.trim().is_empty()),
            pickup_date: input.pickup_date,
            time_slot: time_slot.to_string(),
        });

        self.metrics.pickups_in_store.inc();
        info!(pickup_id = %record.id, customer_id = %actor.id, "pickup scheduled");
        Ok(record)
    }

    fn try_accept(&self, actor: &Identity, pickup_id: Uuid) -> Result<PickupRequest, EngineError> {
        if actor.role != Role::Partner {
            return Err(EngineError::Unauthorized);
        }

        let updated = self.store.update(pickup_id, |record| match &record.phase {
            PickupPhase::Pending => {
                let mut next = record.clone();
                next.phase = PickupPhase::Accepted {
                    assignment: PartnerAssignment {
                        partner_id: actor.id,
                        partner_name: actor.display_name().to_string(),
                        pickup_code: generate_pickup_code(),
                    },
                };
                Ok(next)
            }
            other => Err(EngineError::InvalidTransition {
                action: "accept",
                status: other.status(),
            }),
        })?;

        info!(pickup_id = %updated.id, partner_id = %actor.id, "pickup accepted");
        Ok(updated)
    }

    fn try_start(
        &self,
        actor: &Identity,
        pickup_id: Uuid,
        entered_code: &str,
    ) -> Result<PickupRequest, EngineError> {
        if actor.role != Role::Partner {
            return Err(EngineError::Unauthorized);
        }

        let updated = self.store.update(pickup_id, |record| match &record.phase {
            PickupPhase::Accepted { assignment } => {
                if assignment.partner_id != actor.id {
                    Err(EngineError::Unauthorized)
                } else if assignment.pickup_code != entered_code {
                    Err(EngineError::CodeMismatch)
                } else {
                    let mut next = record.clone();
                    next.phase = PickupPhase::InProcess {
                        assignment: assignment.clone(),
                    };
                    Ok(next)
                }
            }
            other => Err(EngineError::InvalidTransition {
                action: "start",
                status: other.status(),
            }),
        })?;

        info!(pickup_id = %updated.id, "pickup collection started");
        Ok(updated)
    }

    /// Items are fixed once submitted: a second submission while the record
    /// awaits customer review is rejected instead of silently overwriting.
    fn try_submit_items(
        &self,
        actor: &Identity,
        pickup_id: Uuid,
        items: Vec<PickupItem>,
        total_amount: f64,
    ) -> Result<PickupRequest, EngineError> {
        if actor.role != Role::Partner {
            return Err(EngineError::Unauthorized);
        }

        let receipt = Receipt {
            items,
            total_amount,
        };
        validate_receipt(&receipt)?;

        let updated = self
            .store
            .update(pickup_id, move |record| match &record.phase {
                PickupPhase::InProcess { assignment } => {
                    if assignment.partner_id != actor.id {
                        return Err(EngineError::Unauthorized);
                    }
                    let mut next = record.clone();
                    next.phase = PickupPhase::PendingApproval {
                        assignment: assignment.clone(),
                        receipt,
                    };
                    Ok(next)
                }
                other => Err(EngineError::InvalidTransition {
                    action: "submit items for",
                    status: other.status(),
                }),
            })?;

        info!(
            pickup_id = %updated.id,
            total_amount = updated.total_amount().unwrap_or(0.0),
            "items submitted for approval"
        );
        Ok(updated)
    }

    fn try_approve(&self, actor: &Identity, pickup_id: Uuid) -> Result<PickupRequest, EngineError> {
        if actor.role != Role::Customer {
            return Err(EngineError::Unauthorized);
        }

        let updated = self.store.update(pickup_id, |record| {
            if record.customer_id != actor.id {
                return Err(EngineError::Unauthorized);
            }
            match &record.phase {
                PickupPhase::PendingApproval {
                    assignment,
                    receipt,
                } => {
                    let mut next = record.clone();
                    next.phase = PickupPhase::Completed {
                        assignment: assignment.clone(),
                        receipt: receipt.clone(),
                    };
                    Ok(next)
                }
                other => Err(EngineError::InvalidTransition {
                    action: "approve",
                    status: other.status(),
                }),
            }
        })?;

        self.metrics
            .completed_payout_total
            .inc_by(updated.total_amount().unwrap_or(0.0));
        info!(pickup_id = %updated.id, "pickup approved and completed");
        Ok(updated)
    }

    fn finish(
        &self,
        operation: &'static str,
        result: Result<PickupRequest, EngineError>,
    ) -> Result<PickupRequest, EngineError> {
        match &result {
            Ok(record) => {
                self.metrics
                    .lifecycle_transitions_total
                    .with_label_values(&[operation, "success"])
                    .inc();
                let _ = self.events_tx.send(record.clone());
            }
            Err(err) => {
                self.metrics
                    .lifecycle_transitions_total
                    .with_label_values(&[operation, "error"])
                    .inc();
                debug!(error = %err, operation, "lifecycle operation rejected");
            }
        }
        result
    }
}

fn validate_receipt(receipt: &Receipt) -> Result<(), EngineError> {
    if receipt.items.is_empty() {
        return Err(EngineError::InvalidInput(
            "at least one item is required".to_string(),
        ));
    }

    for item in &receipt.items {
        if item.name.trim().is_empty() {
            return Err(EngineError::InvalidInput(format!(
                "item {} has an empty name",
                item.id
            )));
        }
        if item.quantity == 0 {
            return Err(EngineError::InvalidInput(format!(
                "quantity of {} must be positive",
                item.name
            )));
        }
        if !item.price.is_finite() || item.price < 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "price of {} must be non-negative",
                item.name
            )));
        }
    }

    let computed: f64 = receipt
        .items
        .iter()
        .map(|item| f64::from(item.quantity) * item.price)
        .sum();
    if (computed - receipt.total_amount).abs() > AMOUNT_TOLERANCE {
        return Err(EngineError::InvalidInput(format!(
            "total amount {} does not match item sum {computed}",
            receipt.total_amount
        )));
    }

    Ok(())
}
