use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use leadmarket::marketplace::events::{AuditEvent, EventError, EventPublisher, Notification};
use leadmarket::marketplace::health::{
    BrokerAuditAggregates, BrokerStatsRepository, BrokerSummary, ContractorEngagement,
};
use leadmarket::marketplace::leads::{BuyerType, Lead, LeadId, LeadRepository, LeadStatus};
use leadmarket::marketplace::payments::{
    ChargeState, GatewayError, Payment, PaymentGateway, PaymentId, PaymentRefundState,
    PaymentRepository,
};
use leadmarket::marketplace::refunds::{
    RefundFilters, RefundRequest, RefundRequestId, RefundRequestRepository, RefundStatus,
};
use leadmarket::marketplace::storage::RepositoryError;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Brokered job a lead originates from.
#[derive(Debug, Clone)]
pub(crate) struct JobRecord {
    pub(crate) broker_id: String,
    pub(crate) service_type: String,
}

/// Broker registration plus the network counts operations maintains.
#[derive(Debug, Clone)]
pub(crate) struct BrokerRecord {
    pub(crate) broker_id: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_activity: Option<DateTime<Utc>>,
    pub(crate) contractor_count: u32,
    pub(crate) hes_assessor_count: u32,
    pub(crate) inspector_count: u32,
}

#[derive(Default)]
struct StoreState {
    jobs: HashMap<String, JobRecord>,
    brokers: HashMap<String, BrokerRecord>,
    leads: HashMap<LeadId, Lead>,
    payments: HashMap<PaymentId, Payment>,
    refunds: HashMap<RefundRequestId, RefundRequest>,
}

/// One mutex-guarded store backing every repository trait.
///
/// Holding all tables behind a single lock is what gives `claim_for_purchase`
/// its compare-and-swap semantics and `audit_snapshot` its single-instant
/// read.
#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<StoreState>,
}

static PAYMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

impl MemoryStore {
    pub(crate) fn seed_broker(&self, broker: BrokerRecord) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.brokers.insert(broker.broker_id.clone(), broker);
    }

    pub(crate) fn seed_job(&self, job_ref: &str, broker_id: &str, service_type: &str) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.jobs.insert(
            job_ref.to_string(),
            JobRecord {
                broker_id: broker_id.to_string(),
                service_type: service_type.to_string(),
            },
        );
    }

    pub(crate) fn payment_for(&self, contractor_id: &str, lead_id: &LeadId) -> Option<Payment> {
        let state = self.state.lock().expect("store mutex poisoned");
        state
            .payments
            .values()
            .filter(|payment| {
                payment.contractor_id == contractor_id && &payment.lead_id == lead_id
            })
            .max_by_key(|payment| payment.created_at)
            .cloned()
    }

    fn summary_locked(state: &StoreState, broker_id: &str) -> Option<BrokerSummary> {
        let broker = state.brokers.get(broker_id)?;

        let broker_leads: Vec<&Lead> = state
            .leads
            .values()
            .filter(|lead| {
                state
                    .jobs
                    .get(&lead.job_ref)
                    .map(|job| job.broker_id == broker_id)
                    .unwrap_or(false)
            })
            .collect();

        let leads_posted = broker_leads
            .iter()
            .filter(|lead| lead.posted_at.is_some())
            .count() as u32;
        let leads_closed = broker_leads
            .iter()
            .filter(|lead| lead.status == LeadStatus::Sold)
            .count() as u32;
        let revenue_cents = broker_leads
            .iter()
            .filter(|lead| lead.status == LeadStatus::Sold)
            .map(|lead| lead.price_cents)
            .sum();

        let lead_activity = broker_leads
            .iter()
            .flat_map(|lead| [lead.posted_at, lead.sold_at])
            .flatten()
            .max();
        let last_activity = match (broker.last_activity, lead_activity) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        Some(BrokerSummary {
            broker_id: broker.broker_id.clone(),
            leads_posted,
            leads_closed,
            revenue_cents,
            contractor_count: broker.contractor_count,
            hes_assessor_count: broker.hes_assessor_count,
            inspector_count: broker.inspector_count,
            last_activity,
            created_at: broker.created_at,
        })
    }
}

impl LeadRepository for MemoryStore {
    fn job_exists(&self, job_ref: &str) -> Result<bool, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.jobs.contains_key(job_ref))
    }

    fn insert(&self, lead: Lead) -> Result<Lead, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if state.leads.contains_key(&lead.id) {
            return Err(RepositoryError::Conflict);
        }
        state.leads.insert(lead.id.clone(), lead.clone());
        Ok(lead)
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.leads.get(id).cloned())
    }

    fn update(&self, lead: Lead) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if !state.leads.contains_key(&lead.id) {
            return Err(RepositoryError::NotFound);
        }
        state.leads.insert(lead.id.clone(), lead);
        Ok(())
    }

    fn claim_for_purchase(
        &self,
        id: &LeadId,
        buyer_id: &str,
        buyer_type: BuyerType,
        sold_at: DateTime<Utc>,
    ) -> Result<Option<Lead>, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");

        let claimed = match state.leads.get_mut(id) {
            Some(lead) if lead.status == LeadStatus::Active && lead.buyer_id.is_none() => {
                lead.status = LeadStatus::Sold;
                lead.buyer_id = Some(buyer_id.to_string());
                lead.buyer_type = Some(buyer_type);
                lead.sold_at = Some(sold_at);
                lead.clone()
            }
            _ => return Ok(None),
        };

        // Capture against the card network is external; the store records
        // the completed payment row the billing layer would have written.
        let sequence = PAYMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let payment = Payment {
            id: PaymentId(format!("pay-{sequence:06}")),
            contractor_id: buyer_id.to_string(),
            lead_id: claimed.id.clone(),
            amount_cents: claimed.price_cents,
            created_at: sold_at,
            refund_state: PaymentRefundState::None,
            charge_ref: format!("ch_{sequence:08x}"),
            refund_ref: None,
            refund_amount_cents: None,
            refunded_at: None,
        };
        state.payments.insert(payment.id.clone(), payment);

        Ok(Some(claimed))
    }

    fn delete(&self, id: &LeadId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        Ok(state.leads.remove(id).is_some())
    }
}

impl PaymentRepository for MemoryStore {
    fn latest_completed(
        &self,
        contractor_id: &str,
        lead_id: &LeadId,
    ) -> Result<Option<Payment>, RepositoryError> {
        Ok(self.payment_for(contractor_id, lead_id))
    }

    fn fetch(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.payments.get(id).cloned())
    }

    fn set_refund_state(
        &self,
        id: &PaymentId,
        refund_state: PaymentRefundState,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let payment = state.payments.get_mut(id).ok_or(RepositoryError::NotFound)?;
        payment.refund_state = refund_state;
        Ok(())
    }

    fn record_refund(
        &self,
        id: &PaymentId,
        refund_ref: &str,
        amount_cents: i64,
        refunded_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let payment = state.payments.get_mut(id).ok_or(RepositoryError::NotFound)?;
        payment.refund_state = PaymentRefundState::Refunded;
        payment.refund_ref = Some(refund_ref.to_string());
        payment.refund_amount_cents = Some(amount_cents);
        payment.refunded_at = Some(refunded_at);
        Ok(())
    }

    fn completed_purchase_count(&self, contractor_id: &str) -> Result<u32, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .payments
            .values()
            .filter(|payment| payment.contractor_id == contractor_id)
            .count() as u32)
    }
}

impl RefundRequestRepository for MemoryStore {
    fn insert_pending(&self, request: RefundRequest) -> Result<RefundRequest, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let duplicate = state.refunds.values().any(|existing| {
            existing.status == RefundStatus::Pending
                && existing.contractor_id == request.contractor_id
                && existing.lead_id == request.lead_id
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        state.refunds.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn fetch(&self, id: &RefundRequestId) -> Result<Option<RefundRequest>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.refunds.get(id).cloned())
    }

    fn update(&self, request: RefundRequest) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if !state.refunds.contains_key(&request.id) {
            return Err(RepositoryError::NotFound);
        }
        state.refunds.insert(request.id.clone(), request);
        Ok(())
    }

    fn pending_exists(
        &self,
        contractor_id: &str,
        lead_id: &LeadId,
    ) -> Result<bool, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.refunds.values().any(|request| {
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
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .refunds
            .values()
            .filter(|request| {
                request.contractor_id == contractor_id && request.created_at >= since
            })
            .count() as u32)
    }

    fn lifetime_count(&self, contractor_id: &str) -> Result<u32, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .refunds
            .values()
            .filter(|request| request.contractor_id == contractor_id)
            .count() as u32)
    }

    fn list(&self, filters: &RefundFilters) -> Result<Vec<RefundRequest>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let mut matches: Vec<_> = state
            .refunds
            .values()
            .filter(|request| filters.matches(request))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches)
    }
}

impl BrokerStatsRepository for MemoryStore {
    fn summary(&self, broker_id: &str) -> Result<Option<BrokerSummary>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(Self::summary_locked(&state, broker_id))
    }

    fn audit_snapshot(
        &self,
        broker_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<BrokerAuditAggregates>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let summary = match Self::summary_locked(&state, broker_id) {
            Some(summary) => summary,
            None => return Ok(None),
        };

        let broker_leads: Vec<&Lead> = state
            .leads
            .values()
            .filter(|lead| {
                state
                    .jobs
                    .get(&lead.job_ref)
                    .map(|job| job.broker_id == broker_id)
                    .unwrap_or(false)
            })
            .collect();

        let posted_within = |days: i64| {
            broker_leads
                .iter()
                .filter(|lead| {
                    lead.posted_at
                        .map(|at| now - at <= Duration::days(days))
                        .unwrap_or(false)
                })
                .count() as u32
        };

        let days_to_close = broker_leads
            .iter()
            .filter_map(|lead| lead.sold_at.map(|sold| (sold - lead.created_at).num_days()))
            .collect();

        let mut revenue_by_service_cents = BTreeMap::new();
        for lead in &broker_leads {
            if lead.status != LeadStatus::Sold {
                continue;
            }
            if let Some(job) = state.jobs.get(&lead.job_ref) {
                *revenue_by_service_cents
                    .entry(job.service_type.clone())
                    .or_insert(0) += lead.price_cents;
            }
        }

        let mut engagement: BTreeMap<String, ContractorEngagement> = BTreeMap::new();
        for lead in &broker_leads {
            let Some(buyer_id) = &lead.buyer_id else {
                continue;
            };
            let entry = engagement
                .entry(buyer_id.clone())
                .or_insert_with(|| ContractorEngagement {
                    contractor_id: buyer_id.clone(),
                    leads_sent: 0,
                    leads_closed: 0,
                });
            entry.leads_sent += 1;
            // A sale stays "closed" unless its payment was clawed back.
            let refunded = state.payments.values().any(|payment| {
                payment.lead_id == lead.id
                    && payment.refund_state == PaymentRefundState::Refunded
            });
            if !refunded {
                entry.leads_closed += 1;
            }
        }

        Ok(Some(BrokerAuditAggregates {
            summary,
            leads_last_30_days: posted_within(30),
            leads_last_7_days: posted_within(7),
            days_to_close,
            revenue_by_service_cents,
            contractor_engagement: engagement.into_values().collect(),
        }))
    }
}

/// Gateway stand-in that issues deterministic refund references.
#[derive(Default)]
pub(crate) struct StubPaymentGateway {
    refunds: Mutex<Vec<String>>,
}

impl PaymentGateway for StubPaymentGateway {
    fn refund(&self, charge_ref: &str) -> Result<String, GatewayError> {
        let mut guard = self.refunds.lock().expect("gateway mutex poisoned");
        guard.push(charge_ref.to_string());
        Ok(format!("re_{:06}", guard.len()))
    }

    fn verify(&self, _charge_ref: &str) -> Result<ChargeState, GatewayError> {
        Ok(ChargeState::Succeeded)
    }
}

/// Event sink that forwards audits and notifications to the log.
#[derive(Default)]
pub(crate) struct LoggingEventPublisher;

impl EventPublisher for LoggingEventPublisher {
    fn audit(&self, event: AuditEvent) -> Result<(), EventError> {
        tracing::info!(
            actor = %event.actor,
            action = %event.action,
            resource = %event.resource,
            "audit"
        );
        Ok(())
    }

    fn notify(&self, notification: Notification) -> Result<(), EventError> {
        tracing::info!(
            recipient = %notification.recipient,
            template = %notification.template,
            "notification"
        );
        Ok(())
    }
}
