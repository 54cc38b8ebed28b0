use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PickupStatus {
    Pending,
    Accepted,
    InProcess,
    PendingApproval,
    Completed,
}

impl PickupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickupStatus::Pending => "pending",
            PickupStatus::Accepted => "accepted",
            PickupStatus::InProcess => "in-process",
            PickupStatus::PendingApproval => "pending-approval",
            PickupStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for PickupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partner fields and the pickup code, fixed once the pickup is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerAssignment {
    pub partner_id: Uuid,
    pub partner_name: String,
    pub pickup_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

/// Items and their total, submitted together. The total must equal the sum
/// of `quantity * price` over the items; the engine rejects anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub items: Vec<PickupItem>,
    pub total_amount: f64,
}

/// Lifecycle position of a pickup. Accreted data lives inside the variant
/// where it is defined, so a pending pickup cannot carry a code and an
/// in-process pickup cannot carry items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum PickupPhase {
    Pending,
    Accepted {
        #[serde(flatten)]
        assignment: PartnerAssignment,
    },
    InProcess {
        #[serde(flatten)]
        assignment: PartnerAssignment,
    },
    PendingApproval {
        #[serde(flatten)]
        assignment: PartnerAssignment,
        #[serde(flatten)]
        receipt: Receipt,
    },
    Completed {
        #[serde(flatten)]
        assignment: PartnerAssignment,
        #[serde(flatten)]
        receipt: Receipt,
    },
}

impl PickupPhase {
    pub fn status(&self) -> PickupStatus {
        match self {
            PickupPhase::Pending => PickupStatus::Pending,
            PickupPhase::Accepted { .. } => PickupStatus::Accepted,
            PickupPhase::InProcess { .. } => PickupStatus::InProcess,
            PickupPhase::PendingApproval { .. } => PickupStatus::PendingApproval,
            PickupPhase::Completed { .. } => PickupStatus::Completed,
        }
    }

    pub fn assignment(&self) -> Option<&PartnerAssignment> {
        match self {
            PickupPhase::Pending => None,
            PickupPhase::Accepted { assignment }
            | PickupPhase::InProcess { assignment }
            | PickupPhase::PendingApproval { assignment, .. }
            | PickupPhase::Completed { assignment, .. } => Some(assignment),
        }
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        match self {
            PickupPhase::PendingApproval { receipt, .. }
            | PickupPhase::Completed { receipt, .. } => Some(receipt),
            _ => None,
        }
    }
}

/// One scrap-collection request from scheduling to completion. Customer and
/// scheduling fields never change after creation; everything else accretes
/// through the lifecycle phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupRequest {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_link: Option<String>,
    pub pickup_date: NaiveDate,
    pub time_slot: String,
    #[serde(flatten)]
    pub phase: PickupPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PickupRequest {
    pub fn status(&self) -> PickupStatus {
        self.phase.status()
    }

    pub fn partner_id(&self) -> Option<Uuid> {
        self.phase.assignment().map(|a| a.partner_id)
    }

    pub fn pickup_code(&self) -> Option<&str> {
        self.phase.assignment().map(|a| a.pickup_code.as_str())
    }

    pub fn items(&self) -> Option<&[PickupItem]> {
        self.phase.receipt().map(|r| r.items.as_slice())
    }

    pub fn total_amount(&self) -> Option<f64> {
        self.phase.receipt().map(|r| r.total_amount)
    }
}

/// Customer-supplied fields of a new pickup; the store stamps id, phase and
/// timestamps at insertion.
#[derive(Debug, Clone)]
pub struct PickupDraft {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub map_link: Option<String>,
    pub pickup_date: NaiveDate,
    pub time_slot: String,
}
