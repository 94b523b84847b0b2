use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for sellable leads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

/// Lifecycle states of a sellable lead.
///
/// Transitions only move forward: `draft -> active -> sold`, with
/// `expired`/`canceled` reachable from `draft` or `active` and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Draft,
    Active,
    Sold,
    Expired,
    Canceled,
}

impl LeadStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeadStatus::Draft => "draft",
            LeadStatus::Active => "active",
            LeadStatus::Sold => "sold",
            LeadStatus::Expired => "expired",
            LeadStatus::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(LeadStatus::Draft),
            "active" => Some(LeadStatus::Active),
            "sold" => Some(LeadStatus::Sold),
            "expired" => Some(LeadStatus::Expired),
            "canceled" => Some(LeadStatus::Canceled),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, LeadStatus::Sold | LeadStatus::Expired | LeadStatus::Canceled)
    }

    /// Whether `next` is a legal forward move from this state.
    pub fn can_transition_to(self, next: LeadStatus) -> bool {
        match (self, next) {
            (LeadStatus::Draft, LeadStatus::Active) => true,
            (LeadStatus::Active, LeadStatus::Sold) => true,
            (LeadStatus::Draft | LeadStatus::Active, LeadStatus::Expired) => true,
            (LeadStatus::Draft | LeadStatus::Active, LeadStatus::Canceled) => true,
            _ => false,
        }
    }
}

/// Kind of purchaser recorded when a lead is sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyerType {
    Contractor,
    Broker,
    Other,
}

impl BuyerType {
    pub const fn label(self) -> &'static str {
        match self {
            BuyerType::Contractor => "contractor",
            BuyerType::Broker => "broker",
            BuyerType::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "contractor" => Some(BuyerType::Contractor),
            "broker" => Some(BuyerType::Broker),
            "other" => Some(BuyerType::Other),
            _ => None,
        }
    }
}

/// A sellable unit of contractor-opportunity data tied to a brokered job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    /// Owning job reference; immutable for the life of the lead.
    pub job_ref: String,
    pub status: LeadStatus,
    pub price_cents: i64,
    /// Set on the first transition to `active`, never cleared.
    pub posted_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub buyer_id: Option<String>,
    pub buyer_type: Option<BuyerType>,
    pub sold_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub service_tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn view(&self) -> LeadView {
        LeadView {
            id: self.id.clone(),
            job_ref: self.job_ref.clone(),
            status: self.status.label(),
            price_cents: self.price_cents,
            posted_at: self.posted_at,
            expires_at: self.expires_at,
            buyer_id: self.buyer_id.clone(),
            buyer_type: self.buyer_type.map(BuyerType::label),
            sold_at: self.sold_at,
            notes: self.notes.clone(),
            service_tags: self.service_tags.iter().cloned().collect(),
        }
    }
}

/// Inputs for creating a lead in `draft`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadDraft {
    pub job_ref: String,
    pub price_cents: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub service_tags: BTreeSet<String>,
}

/// Whitelisted partial update; any field left `None` is untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadPatch {
    /// Raw status string; must parse to one of the five legal values.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub service_tags: Option<BTreeSet<String>>,
}

impl LeadPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.price_cents.is_none()
            && self.notes.is_none()
            && self.posted_at.is_none()
            && self.expires_at.is_none()
            && self.service_tags.is_none()
    }
}

/// Sanitized representation of a lead for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct LeadView {
    pub id: LeadId,
    pub job_ref: String,
    pub status: &'static str,
    pub price_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sold_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub service_tags: Vec<String>,
}
