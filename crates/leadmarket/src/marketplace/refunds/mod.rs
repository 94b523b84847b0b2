//! Refund claims: eligibility, review state machine, and risk scoring.

pub mod domain;
pub mod repository;
pub mod risk;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    LeadKind, ReasonCategory, RefundClaim, RefundFilters, RefundRequest, RefundRequestId,
    RefundRequestView, RefundStatus,
};
pub use repository::RefundRequestRepository;
pub use risk::{score_request, RiskAssessment, RiskComponent, RiskInputs, RiskSignal};
pub use router::refund_router;
pub use service::{RefundError, RefundService};
