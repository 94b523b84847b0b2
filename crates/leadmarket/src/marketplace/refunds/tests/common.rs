use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::config::MarketplaceConfig;
use crate::marketplace::events::{AuditEvent, EventError, EventPublisher, Notification};
use crate::marketplace::leads::LeadId;
use crate::marketplace::payments::{
    ChargeState, GatewayError, Payment, PaymentGateway, PaymentId, PaymentRefundState,
    PaymentRepository,
};
use crate::marketplace::refunds::domain::{
    LeadKind, ReasonCategory, RefundClaim, RefundFilters, RefundRequest, RefundRequestId,
    RefundStatus,
};
use crate::marketplace::refunds::repository::RefundRequestRepository;
use crate::marketplace::refunds::service::RefundService;
use crate::marketplace::storage::RepositoryError;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 20, 15, 0, 0)
        .single()
        .expect("valid timestamp")
}

// Seeded with a wall-clock timestamp so router-driven tests, which stamp
// requests with the real clock, stay inside the eligibility window.
pub(super) fn payment(contractor_id: &str, lead_id: &str, amount_cents: i64) -> Payment {
    static PAYMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
    let id = PAYMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    Payment {
        id: PaymentId(format!("pay-{id:06}")),
        contractor_id: contractor_id.to_string(),
        lead_id: LeadId(lead_id.to_string()),
        amount_cents,
        created_at: Utc::now(),
        refund_state: PaymentRefundState::None,
        charge_ref: format!("ch_{id:08x}"),
        refund_ref: None,
        refund_amount_cents: None,
        refunded_at: None,
    }
}

pub(super) fn claim(contractor_id: &str, lead_id: &str) -> RefundClaim {
    RefundClaim {
        contractor_id: contractor_id.to_string(),
        lead_id: LeadId(lead_id.to_string()),
        lead_kind: LeadKind::Standard,
        reason: "homeowner phone disconnected on every attempt".to_string(),
        reason_category: ReasonCategory::BadContactInfo,
        notes: Some("called three times over two days".to_string()),
    }
}

pub(super) type TestRefundService =
    RefundService<MemoryRefunds, MemoryPayments, RecordingGateway, MemoryEvents>;

pub(super) struct TestContext {
    pub(super) service: TestRefundService,
    pub(super) requests: Arc<MemoryRefunds>,
    pub(super) payments: Arc<MemoryPayments>,
    pub(super) gateway: Arc<RecordingGateway>,
    pub(super) events: Arc<MemoryEvents>,
}

pub(super) fn build_service() -> TestContext {
    let requests = Arc::new(MemoryRefunds::default());
    let payments = Arc::new(MemoryPayments::default());
    let gateway = Arc::new(RecordingGateway::default());
    let events = Arc::new(MemoryEvents::default());
    let service = RefundService::new(
        requests.clone(),
        payments.clone(),
        gateway.clone(),
        events.clone(),
        &MarketplaceConfig::default(),
    );
    TestContext {
        service,
        requests,
        payments,
        gateway,
        events,
    }
}

#[derive(Default)]
pub(super) struct MemoryRefunds {
    records: Mutex<HashMap<RefundRequestId, RefundRequest>>,
}

impl RefundRequestRepository for MemoryRefunds {
    fn insert_pending(&self, request: RefundRequest) -> Result<RefundRequest, RepositoryError> {
        let mut guard = self.records.lock().expect("refund mutex poisoned");
        let duplicate = guard.values().any(|existing| {
            existing.status == RefundStatus::Pending
                && existing.contractor_id == request.contractor_id
                && existing.lead_id == request.lead_id
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn fetch(&self, id: &RefundRequestId) -> Result<Option<RefundRequest>, RepositoryError> {
        let guard = self.records.lock().expect("refund mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, request: RefundRequest) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("refund mutex poisoned");
        if !guard.contains_key(&request.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(request.id.clone(), request);
        Ok(())
    }

    fn pending_exists(
        &self,
        contractor_id: &str,
        lead_id: &LeadId,
    ) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().expect("refund mutex poisoned");
        Ok(guard.values().any(|request| {
            request.status == RefundStatus::Pending
                && request.contractor_id == contractor_id
                && &request.lead_id == lead_id
        }))
    }

    fn count_since(
        &self,
        contractor_id: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, RepositoryError> {
        let guard = self.records.lock().expect("refund mutex poisoned");
        Ok(guard
            .values()
            .filter(|request| {
                request.contractor_id == contractor_id && request.created_at >= since
            })
            .count() as u32)
    }

    fn lifetime_count(&self, contractor_id: &str) -> Result<u32, RepositoryError> {
        let guard = self.records.lock().expect("refund mutex poisoned");
        Ok(guard
            .values()
            .filter(|request| request.contractor_id == contractor_id)
            .count() as u32)
    }

    fn list(&self, filters: &RefundFilters) -> Result<Vec<RefundRequest>, RepositoryError> {
        let guard = self.records.lock().expect("refund mutex poisoned");
        let mut matches: Vec<_> = guard
            .values()
            .filter(|request| filters.matches(request))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches)
    }
}

#[derive(Default)]
pub(super) struct MemoryPayments {
    records: Mutex<HashMap<PaymentId, Payment>>,
}

impl MemoryPayments {
    pub(super) fn seed(&self, payment: Payment) -> PaymentId {
        let id = payment.id.clone();
        self.records
            .lock()
            .expect("payment mutex poisoned")
            .insert(id.clone(), payment);
        id
    }

    pub(super) fn get(&self, id: &PaymentId) -> Payment {
        self.records
            .lock()
            .expect("payment mutex poisoned")
            .get(id)
            .cloned()
            .expect("payment seeded")
    }
}

impl PaymentRepository for MemoryPayments {
    fn latest_completed(
        &self,
        contractor_id: &str,
        lead_id: &LeadId,
    ) -> Result<Option<Payment>, RepositoryError> {
        let guard = self.records.lock().expect("payment mutex poisoned");
        Ok(guard
            .values()
            .filter(|payment| {
                payment.contractor_id == contractor_id && &payment.lead_id == lead_id
            })
            .max_by_key(|payment| payment.created_at)
            .cloned())
    }

    fn fetch(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError> {
        let guard = self.records.lock().expect("payment mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn set_refund_state(
        &self,
        id: &PaymentId,
        state: PaymentRefundState,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("payment mutex poisoned");
        let payment = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        payment.refund_state = state;
        Ok(())
    }

    fn record_refund(
        &self,
        id: &PaymentId,
        refund_ref: &str,
        amount_cents: i64,
        refunded_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("payment mutex poisoned");
        let payment = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        payment.refund_state = PaymentRefundState::Refunded;
        payment.refund_ref = Some(refund_ref.to_string());
        payment.refund_amount_cents = Some(amount_cents);
        payment.refunded_at = Some(refunded_at);
        Ok(())
    }

    fn completed_purchase_count(&self, contractor_id: &str) -> Result<u32, RepositoryError> {
        let guard = self.records.lock().expect("payment mutex poisoned");
        Ok(guard
            .values()
            .filter(|payment| payment.contractor_id == contractor_id)
            .count() as u32)
    }
}

#[derive(Default)]
pub(super) struct RecordingGateway {
    refunds: Mutex<Vec<String>>,
}

impl RecordingGateway {
    pub(super) fn refund_calls(&self) -> Vec<String> {
        self.refunds.lock().expect("gateway mutex poisoned").clone()
    }
}

impl PaymentGateway for RecordingGateway {
    fn refund(&self, charge_ref: &str) -> Result<String, GatewayError> {
        let mut guard = self.refunds.lock().expect("gateway mutex poisoned");
        guard.push(charge_ref.to_string());
        Ok(format!("re_{:04}", guard.len()))
    }

    fn verify(&self, _charge_ref: &str) -> Result<ChargeState, GatewayError> {
        Ok(ChargeState::Succeeded)
    }
}

/// Gateway that declines every refund.
pub(super) struct DecliningGateway;

impl PaymentGateway for DecliningGateway {
    fn refund(&self, _charge_ref: &str) -> Result<String, GatewayError> {
        Err(GatewayError::Declined("charge disputed upstream".to_string()))
    }

    fn verify(&self, _charge_ref: &str) -> Result<ChargeState, GatewayError> {
        Ok(ChargeState::Failed)
    }
}

#[derive(Default)]
pub(super) struct MemoryEvents {
    audits: Mutex<Vec<AuditEvent>>,
    notifications: Mutex<Vec<Notification>>,
}

impl MemoryEvents {
    pub(super) fn audits(&self) -> Vec<AuditEvent> {
        self.audits.lock().expect("event mutex poisoned").clone()
    }

    pub(super) fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .expect("event mutex poisoned")
            .clone()
    }
}

impl EventPublisher for MemoryEvents {
    fn audit(&self, event: AuditEvent) -> Result<(), EventError> {
        self.audits.lock().expect("event mutex poisoned").push(event);
        Ok(())
    }

    fn notify(&self, notification: Notification) -> Result<(), EventError> {
        self.notifications
            .lock()
            .expect("event mutex poisoned")
            .push(notification);
        Ok(())
    }
}
