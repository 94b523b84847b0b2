use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::risk::RiskComponent;
use crate::marketplace::leads::LeadId;
use crate::marketplace::payments::PaymentId;

/// Identifier wrapper for refund requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefundRequestId(pub String);

/// Review states of a refund request.
///
/// `approved` and `denied` are terminal; `more_info_requested` never
/// returns to `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    MoreInfoRequested,
    Approved,
    Denied,
}

impl RefundStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RefundStatus::Pending => "pending",
            RefundStatus::MoreInfoRequested => "more_info_requested",
            RefundStatus::Approved => "approved",
            RefundStatus::Denied => "denied",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(RefundStatus::Pending),
            "more_info_requested" => Some(RefundStatus::MoreInfoRequested),
            "approved" => Some(RefundStatus::Approved),
            "denied" => Some(RefundStatus::Denied),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, RefundStatus::Approved | RefundStatus::Denied)
    }

    /// Whether a reviewer may still approve or deny from this state.
    pub const fn is_reviewable(self) -> bool {
        matches!(self, RefundStatus::Pending | RefundStatus::MoreInfoRequested)
    }
}

/// Why the contractor believes the lead should be refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCategory {
    BadContactInfo,
    CustomerUnresponsive,
    AlreadyServed,
    OutsideServiceArea,
    DuplicateLead,
    Other,
}

impl ReasonCategory {
    pub const fn label(self) -> &'static str {
        match self {
            ReasonCategory::BadContactInfo => "bad_contact_info",
            ReasonCategory::CustomerUnresponsive => "customer_unresponsive",
            ReasonCategory::AlreadyServed => "already_served",
            ReasonCategory::OutsideServiceArea => "outside_service_area",
            ReasonCategory::DuplicateLead => "duplicate_lead",
            ReasonCategory::Other => "other",
        }
    }
}

/// Discriminates which kind of lead the request references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadKind {
    Standard,
    Appointment,
}

impl LeadKind {
    pub const fn label(self) -> &'static str {
        match self {
            LeadKind::Standard => "standard",
            LeadKind::Appointment => "appointment",
        }
    }
}

/// A contractor's claim against a purchased lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundRequest {
    pub id: RefundRequestId,
    pub payment_id: PaymentId,
    pub contractor_id: String,
    pub lead_id: LeadId,
    pub lead_kind: LeadKind,
    pub reason: String,
    pub reason_category: ReasonCategory,
    pub notes: Option<String>,
    /// Advisory 0-100 heuristic, computed once at creation and never
    /// recomputed.
    pub risk_score: u8,
    pub risk_breakdown: Vec<RiskComponent>,
    pub status: RefundStatus,
    pub info_requested: Option<String>,
    pub info_requested_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub refund_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefundRequest {
    pub fn view(&self) -> RefundRequestView {
        RefundRequestView {
            id: self.id.clone(),
            payment_id: self.payment_id.clone(),
            contractor_id: self.contractor_id.clone(),
            lead_id: self.lead_id.clone(),
            lead_kind: self.lead_kind.label(),
            reason: self.reason.clone(),
            reason_category: self.reason_category.label(),
            notes: self.notes.clone(),
            risk_score: self.risk_score,
            risk_breakdown: self.risk_breakdown.clone(),
            status: self.status.label(),
            info_requested: self.info_requested.clone(),
            admin_notes: self.admin_notes.clone(),
            reviewed_by: self.reviewed_by.clone(),
            reviewed_at: self.reviewed_at,
            refund_date: self.refund_date,
            created_at: self.created_at,
        }
    }
}

/// Inputs supplied by the contractor when filing a claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundClaim {
    pub contractor_id: String,
    pub lead_id: LeadId,
    pub lead_kind: LeadKind,
    pub reason: String,
    pub reason_category: ReasonCategory,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Listing filters; each is independently optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefundFilters {
    pub status: Option<RefundStatus>,
    pub contractor_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl RefundFilters {
    pub fn matches(&self, request: &RefundRequest) -> bool {
        if let Some(status) = self.status {
            if request.status != status {
                return false;
            }
        }
        if let Some(contractor_id) = &self.contractor_id {
            if &request.contractor_id != contractor_id {
                return false;
            }
        }
        if let Some(from) = self.from {
            if request.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if request.created_at > to {
                return false;
            }
        }
        true
    }
}

/// Sanitized representation of a refund request for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct RefundRequestView {
    pub id: RefundRequestId,
    pub payment_id: PaymentId,
    pub contractor_id: String,
    pub lead_id: LeadId,
    pub lead_kind: &'static str,
    pub reason: String,
    pub reason_category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub risk_score: u8,
    pub risk_breakdown: Vec<RiskComponent>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_requested: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
