use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::domain::{RefundClaim, RefundFilters, RefundRequest, RefundRequestId, RefundStatus};
use super::repository::RefundRequestRepository;
use super::risk::{score_request, RiskInputs};
use crate::config::MarketplaceConfig;
use crate::error::ErrorKind;
use crate::marketplace::events::{
    audit_best_effort, notify_best_effort, AuditEvent, EventPublisher, Notification,
};
use crate::marketplace::payments::{
    GatewayError, Payment, PaymentGateway, PaymentId, PaymentRefundState, PaymentRepository,
};
use crate::marketplace::storage::RepositoryError;

const FREQUENCY_WINDOW_DAYS: i64 = 7;

/// Service composing the refund state machine, risk scoring, and the
/// payment-processor seam.
pub struct RefundService<R, P, G, E> {
    requests: Arc<R>,
    payments: Arc<P>,
    gateway: Arc<G>,
    events: Arc<E>,
    refund_window: Duration,
}

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> RefundRequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RefundRequestId(format!("rr-{id:06}"))
}

impl<R, P, G, E> RefundService<R, P, G, E>
where
    R: RefundRequestRepository + 'static,
    P: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(
        requests: Arc<R>,
        payments: Arc<P>,
        gateway: Arc<G>,
        events: Arc<E>,
        config: &MarketplaceConfig,
    ) -> Self {
        Self {
            requests,
            payments,
            gateway,
            events,
            refund_window: Duration::days(config.refund_window_days),
        }
    }

    /// File a refund claim against the contractor's most recent completed
    /// payment for the lead.
    pub fn request(
        &self,
        claim: RefundClaim,
        now: DateTime<Utc>,
    ) -> Result<RefundRequest, RefundError> {
        if claim.reason.trim().is_empty() {
            return Err(RefundError::EmptyReason);
        }

        let payment = self
            .payments
            .latest_completed(&claim.contractor_id, &claim.lead_id)?
            .ok_or_else(|| RefundError::PaymentNotFound {
                contractor_id: claim.contractor_id.clone(),
                lead_id: claim.lead_id.0.clone(),
            })?;

        if payment.refund_state != PaymentRefundState::None {
            return Err(RefundError::AlreadyRequested {
                state: payment.refund_state,
            });
        }

        let elapsed = now - payment.created_at;
        if elapsed > self.refund_window {
            return Err(RefundError::WindowExpired {
                days_elapsed: elapsed.num_days(),
                window_days: self.refund_window.num_days(),
            });
        }

        if self
            .requests
            .pending_exists(&claim.contractor_id, &claim.lead_id)?
        {
            return Err(RefundError::DuplicatePending);
        }

        let assessment = score_request(&RiskInputs {
            recent_request_count: self
                .requests
                .count_since(&claim.contractor_id, now - Duration::days(FREQUENCY_WINDOW_DAYS))?,
            lifetime_request_count: self.requests.lifetime_count(&claim.contractor_id)?,
            lifetime_purchase_count: self
                .payments
                .completed_purchase_count(&claim.contractor_id)?,
            notes: claim.notes.clone(),
            payment_amount_cents: payment.amount_cents,
            purchased_at: payment.created_at,
            requested_at: now,
        });

        let request = RefundRequest {
            id: next_request_id(),
            payment_id: payment.id.clone(),
            contractor_id: claim.contractor_id,
            lead_id: claim.lead_id,
            lead_kind: claim.lead_kind,
            reason: claim.reason,
            reason_category: claim.reason_category,
            notes: claim.notes,
            risk_score: assessment.score,
            risk_breakdown: assessment.components,
            status: RefundStatus::Pending,
            info_requested: None,
            info_requested_at: None,
            admin_notes: None,
            reviewed_by: None,
            reviewed_at: None,
            refund_date: None,
            created_at: now,
        };

        // The repository re-checks the duplicate guard under its own lock,
        // closing the race between two simultaneous requests.
        let stored = match self.requests.insert_pending(request) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => return Err(RefundError::DuplicatePending),
            Err(other) => return Err(other.into()),
        };

        self.payments
            .set_refund_state(&stored.payment_id, PaymentRefundState::Requested)?;

        self.record(&stored, "refund.requested", BTreeMap::new());
        self.notify_contractor(&stored, "refund_request_received");

        Ok(stored)
    }

    /// Approve a reviewable request, issuing the refund through the payment
    /// gateway first; a gateway failure leaves every local row untouched.
    pub fn approve(
        &self,
        id: &RefundRequestId,
        reviewer_id: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RefundRequest, RefundError> {
        let mut request = self.fetch_existing(id)?;

        if !request.status.is_reviewable() {
            return Err(RefundError::NotReviewable {
                status: request.status,
            });
        }

        let payment = self.fetch_payment(&request.payment_id)?;
        let refund_ref = self.gateway.refund(&payment.charge_ref)?;

        request.status = RefundStatus::Approved;
        request.reviewed_by = Some(reviewer_id.to_string());
        request.reviewed_at = Some(now);
        request.admin_notes = notes;
        request.refund_date = Some(now);

        self.requests.update(request.clone())?;
        self.payments
            .record_refund(&payment.id, &refund_ref, payment.amount_cents, now)?;

        let mut metadata = BTreeMap::new();
        metadata.insert("refund_ref".to_string(), refund_ref);
        self.record(&request, "refund.approved", metadata);
        self.notify_contractor(&request, "refund_approved");

        Ok(request)
    }

    /// Deny a reviewable request with a non-empty reason.
    pub fn deny(
        &self,
        id: &RefundRequestId,
        reviewer_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<RefundRequest, RefundError> {
        if reason.trim().is_empty() {
            return Err(RefundError::EmptyDenialReason);
        }

        let mut request = self.fetch_existing(id)?;

        if !request.status.is_reviewable() {
            return Err(RefundError::NotReviewable {
                status: request.status,
            });
        }

        request.status = RefundStatus::Denied;
        request.reviewed_by = Some(reviewer_id.to_string());
        request.reviewed_at = Some(now);
        request.admin_notes = Some(reason.to_string());

        self.requests.update(request.clone())?;
        self.payments
            .set_refund_state(&request.payment_id, PaymentRefundState::Denied)?;

        self.record(&request, "refund.denied", BTreeMap::new());
        self.notify_contractor(&request, "refund_denied");

        Ok(request)
    }

    /// Ask the contractor for more detail; only a pending request qualifies.
    pub fn request_more_info(
        &self,
        id: &RefundRequestId,
        reviewer_id: &str,
        question: &str,
        now: DateTime<Utc>,
    ) -> Result<RefundRequest, RefundError> {
        if question.trim().is_empty() {
            return Err(RefundError::EmptyQuestion);
        }

        let mut request = self.fetch_existing(id)?;

        if request.status != RefundStatus::Pending {
            return Err(RefundError::InfoOnlyFromPending {
                status: request.status,
            });
        }

        request.status = RefundStatus::MoreInfoRequested;
        request.info_requested = Some(question.to_string());
        request.info_requested_at = Some(now);

        self.requests.update(request.clone())?;

        let mut metadata = BTreeMap::new();
        metadata.insert("reviewer_id".to_string(), reviewer_id.to_string());
        self.record(&request, "refund.info_requested", metadata);
        self.notify_contractor(&request, "refund_info_requested");

        Ok(request)
    }

    pub fn get(&self, id: &RefundRequestId) -> Result<RefundRequest, RefundError> {
        self.fetch_existing(id)
    }

    pub fn list(&self, filters: &RefundFilters) -> Result<Vec<RefundRequest>, RefundError> {
        Ok(self.requests.list(filters)?)
    }

    pub fn list_for_contractor(
        &self,
        contractor_id: &str,
    ) -> Result<Vec<RefundRequest>, RefundError> {
        let filters = RefundFilters {
            contractor_id: Some(contractor_id.to_string()),
            ..RefundFilters::default()
        };
        Ok(self.requests.list(&filters)?)
    }

    fn fetch_existing(&self, id: &RefundRequestId) -> Result<RefundRequest, RefundError> {
        self.requests
            .fetch(id)?
            .ok_or_else(|| RefundError::NotFound(id.clone()))
    }

    fn fetch_payment(&self, id: &PaymentId) -> Result<Payment, RefundError> {
        self.payments
            .fetch(id)?
            .ok_or_else(|| RefundError::PaymentRecordMissing(id.clone()))
    }

    fn record(
        &self,
        request: &RefundRequest,
        action: &str,
        mut metadata: BTreeMap<String, String>,
    ) {
        metadata.insert("status".to_string(), request.status.label().to_string());
        metadata.insert("risk_score".to_string(), request.risk_score.to_string());
        audit_best_effort(
            self.events.as_ref(),
            AuditEvent {
                actor: request
                    .reviewed_by
                    .clone()
                    .unwrap_or_else(|| request.contractor_id.clone()),
                action: action.to_string(),
                resource: request.id.0.clone(),
                metadata,
            },
        );
    }

    fn notify_contractor(&self, request: &RefundRequest, template: &str) {
        let mut details = BTreeMap::new();
        details.insert("request_id".to_string(), request.id.0.clone());
        details.insert("lead_id".to_string(), request.lead_id.0.clone());
        if let Some(question) = &request.info_requested {
            details.insert("question".to_string(), question.clone());
        }
        notify_best_effort(
            self.events.as_ref(),
            Notification {
                recipient: request.contractor_id.clone(),
                template: template.to_string(),
                details,
            },
        );
    }
}

/// Error raised by the refund workflow service.
#[derive(Debug, thiserror::Error)]
pub enum RefundError {
    #[error("refund reason must not be empty")]
    EmptyReason,
    #[error("denial reason must not be empty")]
    EmptyDenialReason,
    #[error("information request question must not be empty")]
    EmptyQuestion,
    #[error("no completed payment found for contractor '{contractor_id}' on lead '{lead_id}'")]
    PaymentNotFound {
        contractor_id: String,
        lead_id: String,
    },
    #[error("refund request {} not found", .0 .0)]
    NotFound(RefundRequestId),
    #[error("payment already has refund state '{}'", .state.label())]
    AlreadyRequested { state: PaymentRefundState },
    #[error("refund window expired: {days_elapsed} days since purchase exceeds {window_days}")]
    WindowExpired {
        days_elapsed: i64,
        window_days: i64,
    },
    #[error("a pending refund request already exists for this contractor and lead")]
    DuplicatePending,
    #[error("request is not reviewable while '{}'", .status.label())]
    NotReviewable { status: RefundStatus },
    #[error("information can only be requested while pending, not '{}'", .status.label())]
    InfoOnlyFromPending { status: RefundStatus },
    #[error("payment record {} missing for an existing request", .0 .0)]
    PaymentRecordMissing(PaymentId),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl RefundError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RefundError::EmptyReason
            | RefundError::EmptyDenialReason
            | RefundError::EmptyQuestion
            | RefundError::WindowExpired { .. } => ErrorKind::Validation,
            RefundError::PaymentNotFound { .. } | RefundError::NotFound(_) => ErrorKind::NotFound,
            RefundError::AlreadyRequested { .. }
            | RefundError::DuplicatePending
            | RefundError::NotReviewable { .. }
            | RefundError::InfoOnlyFromPending { .. } => ErrorKind::Conflict,
            RefundError::PaymentRecordMissing(_) | RefundError::Gateway(_) => ErrorKind::Internal,
            RefundError::Repository(err) => err.kind(),
        }
    }
}
