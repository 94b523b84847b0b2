use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::marketplace::events::{AuditEvent, EventError, EventPublisher, Notification};
use crate::marketplace::leads::domain::{BuyerType, Lead, LeadDraft, LeadId};
use crate::marketplace::leads::repository::LeadRepository;
use crate::marketplace::leads::service::LeadService;
use crate::marketplace::storage::RepositoryError;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn draft() -> LeadDraft {
    let mut service_tags = BTreeSet::new();
    service_tags.insert("insulation".to_string());
    service_tags.insert("air_sealing".to_string());
    LeadDraft {
        job_ref: "job-100".to_string(),
        price_cents: 45_00,
        notes: Some("attic retrofit, homeowner pre-qualified".to_string()),
        service_tags,
    }
}

pub(super) fn build_service() -> (
    LeadService<MemoryLeads, MemoryEvents>,
    Arc<MemoryLeads>,
    Arc<MemoryEvents>,
) {
    let repository = Arc::new(MemoryLeads::with_job("job-100"));
    let events = Arc::new(MemoryEvents::default());
    let service = LeadService::new(repository.clone(), events.clone());
    (service, repository, events)
}

#[derive(Default)]
pub(super) struct MemoryLeads {
    jobs: HashSet<String>,
    records: Mutex<HashMap<LeadId, Lead>>,
}

impl MemoryLeads {
    pub(super) fn with_job(job_ref: &str) -> Self {
        let mut jobs = HashSet::new();
        jobs.insert(job_ref.to_string());
        Self {
            jobs,
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl LeadRepository for MemoryLeads {
    fn job_exists(&self, job_ref: &str) -> Result<bool, RepositoryError> {
        Ok(self.jobs.contains(job_ref))
    }

    fn insert(&self, lead: Lead) -> Result<Lead, RepositoryError> {
        let mut guard = self.records.lock().expect("lead mutex poisoned");
        if guard.contains_key(&lead.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(lead.id.clone(), lead.clone());
        Ok(lead)
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let guard = self.records.lock().expect("lead mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, lead: Lead) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("lead mutex poisoned");
        if !guard.contains_key(&lead.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(lead.id.clone(), lead);
        Ok(())
    }

    fn claim_for_purchase(
        &self,
        id: &LeadId,
        buyer_id: &str,
        buyer_type: BuyerType,
        sold_at: DateTime<Utc>,
    ) -> Result<Option<Lead>, RepositoryError> {
        use crate::marketplace::leads::domain::LeadStatus;

        let mut guard = self.records.lock().expect("lead mutex poisoned");
        match guard.get_mut(id) {
            Some(lead) if lead.status == LeadStatus::Active && lead.buyer_id.is_none() => {
                lead.status = LeadStatus::Sold;
                lead.buyer_id = Some(buyer_id.to_string());
                lead.buyer_type = Some(buyer_type);
                lead.sold_at = Some(sold_at);
                Ok(Some(lead.clone()))
            }
            _ => Ok(None),
        }
    }

    fn delete(&self, id: &LeadId) -> Result<bool, RepositoryError> {
        let mut guard = self.records.lock().expect("lead mutex poisoned");
        Ok(guard.remove(id).is_some())
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

    #[allow(dead_code)]
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

/// Event sink whose transport is always down.
pub(super) struct FailingEvents;

impl EventPublisher for FailingEvents {
    fn audit(&self, _event: AuditEvent) -> Result<(), EventError> {
        Err(EventError::Transport("audit sink offline".to_string()))
    }

    fn notify(&self, _notification: Notification) -> Result<(), EventError> {
        Err(EventError::Transport("notifier offline".to_string()))
    }
}

pub(super) struct UnavailableLeads;

impl LeadRepository for UnavailableLeads {
    fn job_exists(&self, _job_ref: &str) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert(&self, _lead: Lead) -> Result<Lead, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _lead: Lead) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn claim_for_purchase(
        &self,
        _id: &LeadId,
        _buyer_id: &str,
        _buyer_type: BuyerType,
        _sold_at: DateTime<Utc>,
    ) -> Result<Option<Lead>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &LeadId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}
