//! Payment records and the processor gateway seam.
//!
//! Payments are owned by the purchase/billing layer; the refund workflow
//! reads them and flips their refund state, nothing more.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::leads::LeadId;
use super::storage::RepositoryError;

/// Identifier wrapper for captured payments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

/// Refund progression recorded on the payment row itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRefundState {
    None,
    Requested,
    Denied,
    Refunded,
}

impl PaymentRefundState {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentRefundState::None => "none",
            PaymentRefundState::Requested => "requested",
            PaymentRefundState::Denied => "denied",
            PaymentRefundState::Refunded => "refunded",
        }
    }
}

/// A completed charge for a purchased lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub contractor_id: String,
    pub lead_id: LeadId,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
    pub refund_state: PaymentRefundState,
    /// Processor charge reference used when issuing a refund.
    pub charge_ref: String,
    pub refund_ref: Option<String>,
    pub refund_amount_cents: Option<i64>,
    pub refunded_at: Option<DateTime<Utc>>,
}

/// Storage abstraction over the payment table.
pub trait PaymentRepository: Send + Sync {
    /// Most recent completed payment by this contractor for this lead.
    fn latest_completed(
        &self,
        contractor_id: &str,
        lead_id: &LeadId,
    ) -> Result<Option<Payment>, RepositoryError>;

    fn fetch(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError>;

    fn set_refund_state(
        &self,
        id: &PaymentId,
        state: PaymentRefundState,
    ) -> Result<(), RepositoryError>;

    /// Record an executed refund: reference, amount, and date, and flip the
    /// state to `refunded` in the same write.
    fn record_refund(
        &self,
        id: &PaymentId,
        refund_ref: &str,
        amount_cents: i64,
        refunded_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Lifetime count of completed purchases by this contractor.
    fn completed_purchase_count(&self, contractor_id: &str) -> Result<u32, RepositoryError>;
}

/// Observed state of a charge at the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeState {
    Succeeded,
    Pending,
    Failed,
}

/// External payment processor contract.
///
/// `refund` must be idempotent per charge reference: the approve flow sits
/// on an at-least-once boundary and may re-issue the call after a crash.
/// A failed call must leave no local state mutated.
pub trait PaymentGateway: Send + Sync {
    fn refund(&self, charge_ref: &str) -> Result<String, GatewayError>;

    fn verify(&self, charge_ref: &str) -> Result<ChargeState, GatewayError>;
}

/// Error raised by the payment processor.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("processor declined the operation: {0}")]
    Declined(String),
    #[error("processor unreachable: {0}")]
    Transport(String),
}
