use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::domain::{BuyerType, Lead, LeadDraft, LeadId, LeadPatch, LeadStatus};
use super::repository::LeadRepository;
use crate::error::ErrorKind;
use crate::marketplace::events::{audit_best_effort, AuditEvent, EventPublisher};
use crate::marketplace::storage::RepositoryError;

/// Service owning the lead state machine and its pricing/posting rules.
pub struct LeadService<R, E> {
    repository: Arc<R>,
    events: Arc<E>,
}

static LEAD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_lead_id() -> LeadId {
    let id = LEAD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LeadId(format!("lead-{id:06}"))
}

impl<R, E> LeadService<R, E>
where
    R: LeadRepository + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(repository: Arc<R>, events: Arc<E>) -> Self {
        Self { repository, events }
    }

    /// Create a lead in `draft` against an existing job reference.
    pub fn create(&self, draft: LeadDraft, now: DateTime<Utc>) -> Result<Lead, LeadError> {
        if draft.price_cents < 0 {
            return Err(LeadError::NegativePrice(draft.price_cents));
        }
        if !self.repository.job_exists(&draft.job_ref)? {
            return Err(LeadError::JobNotFound(draft.job_ref));
        }

        let lead = Lead {
            id: next_lead_id(),
            job_ref: draft.job_ref,
            status: LeadStatus::Draft,
            price_cents: draft.price_cents,
            posted_at: None,
            expires_at: None,
            buyer_id: None,
            buyer_type: None,
            sold_at: None,
            notes: draft.notes,
            service_tags: draft.service_tags,
            created_at: now,
        };

        let stored = self.repository.insert(lead)?;
        self.record("lead.created", &stored, BTreeMap::new());
        Ok(stored)
    }

    /// Post a draft lead for sale, stamping `posted_at`.
    pub fn post(&self, id: &LeadId, now: DateTime<Utc>) -> Result<Lead, LeadError> {
        let mut lead = self.fetch_existing(id)?;

        if lead.status != LeadStatus::Draft {
            return Err(LeadError::NotPostable {
                status: lead.status,
            });
        }

        lead.status = LeadStatus::Active;
        lead.posted_at = Some(now);
        self.repository.update(lead.clone())?;
        self.record("lead.posted", &lead, BTreeMap::new());
        Ok(lead)
    }

    /// Purchase an active lead; exactly one concurrent caller can win.
    ///
    /// The winner is decided by the repository's conditional write, so a
    /// competing purchase observes `Conflict` rather than overwriting.
    pub fn purchase(
        &self,
        id: &LeadId,
        buyer_id: &str,
        buyer_type: &str,
        now: DateTime<Utc>,
    ) -> Result<Lead, LeadError> {
        let buyer_type = BuyerType::parse(buyer_type)
            .ok_or_else(|| LeadError::UnknownBuyerType(buyer_type.to_string()))?;

        match self
            .repository
            .claim_for_purchase(id, buyer_id, buyer_type, now)?
        {
            Some(lead) => {
                let mut metadata = BTreeMap::new();
                metadata.insert("buyer_id".to_string(), buyer_id.to_string());
                metadata.insert("buyer_type".to_string(), buyer_type.label().to_string());
                self.record("lead.sold", &lead, metadata);
                Ok(lead)
            }
            None => match self.repository.fetch(id)? {
                Some(lead) => Err(LeadError::NotPurchasable {
                    status: lead.status,
                }),
                None => Err(LeadError::NotFound(id.clone())),
            },
        }
    }

    /// Whitelist-only partial update of mutable lead fields.
    pub fn update(&self, id: &LeadId, patch: LeadPatch) -> Result<Lead, LeadError> {
        if patch.is_empty() {
            return Err(LeadError::EmptyUpdate);
        }

        let mut lead = self.fetch_existing(id)?;

        if let Some(raw) = &patch.status {
            let next = LeadStatus::parse(raw)
                .ok_or_else(|| LeadError::UnknownStatus(raw.clone()))?;
            if next != lead.status {
                // `sold` is only reachable through purchase, where the buyer
                // fields are assigned.
                if next == LeadStatus::Sold || !lead.status.can_transition_to(next) {
                    return Err(LeadError::IllegalTransition {
                        from: lead.status,
                        to: next,
                    });
                }
                lead.status = next;
            }
        }
        if let Some(price_cents) = patch.price_cents {
            if price_cents < 0 {
                return Err(LeadError::NegativePrice(price_cents));
            }
            lead.price_cents = price_cents;
        }
        if let Some(notes) = patch.notes {
            lead.notes = Some(notes);
        }
        if let Some(posted_at) = patch.posted_at {
            lead.posted_at = Some(posted_at);
        }
        if let Some(expires_at) = patch.expires_at {
            lead.expires_at = Some(expires_at);
        }
        if let Some(service_tags) = patch.service_tags {
            lead.service_tags = service_tags;
        }

        self.repository.update(lead.clone())?;
        self.record("lead.updated", &lead, BTreeMap::new());
        Ok(lead)
    }

    /// Permanently remove a lead.
    pub fn delete(&self, id: &LeadId) -> Result<(), LeadError> {
        if !self.repository.delete(id)? {
            return Err(LeadError::NotFound(id.clone()));
        }
        audit_best_effort(
            self.events.as_ref(),
            AuditEvent {
                actor: "operator".to_string(),
                action: "lead.deleted".to_string(),
                resource: id.0.clone(),
                metadata: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub fn get(&self, id: &LeadId) -> Result<Lead, LeadError> {
        self.fetch_existing(id)
    }

    fn fetch_existing(&self, id: &LeadId) -> Result<Lead, LeadError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| LeadError::NotFound(id.clone()))
    }

    fn record(&self, action: &str, lead: &Lead, mut metadata: BTreeMap<String, String>) {
        metadata.insert("status".to_string(), lead.status.label().to_string());
        audit_best_effort(
            self.events.as_ref(),
            AuditEvent {
                actor: "operator".to_string(),
                action: action.to_string(),
                resource: lead.id.0.clone(),
                metadata,
            },
        );
    }
}

/// Error raised by the lead lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    #[error("job reference '{0}' does not resolve")]
    JobNotFound(String),
    #[error("lead {} not found", .0 .0)]
    NotFound(LeadId),
    #[error("price must be non-negative, got {0}")]
    NegativePrice(i64),
    #[error("unrecognized buyer type '{0}'")]
    UnknownBuyerType(String),
    #[error("'{0}' is not a legal lead status")]
    UnknownStatus(String),
    #[error("update supplied no recognized field")]
    EmptyUpdate,
    #[error("lead cannot be posted while {}", .status.label())]
    NotPostable { status: LeadStatus },
    #[error("lead is not open for purchase (currently {})", .status.label())]
    NotPurchasable { status: LeadStatus },
    #[error("lead status cannot move from {} to {}", .from.label(), .to.label())]
    IllegalTransition { from: LeadStatus, to: LeadStatus },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl LeadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LeadError::JobNotFound(_) | LeadError::NotFound(_) => ErrorKind::NotFound,
            LeadError::NegativePrice(_)
            | LeadError::UnknownBuyerType(_)
            | LeadError::UnknownStatus(_)
            | LeadError::EmptyUpdate => ErrorKind::Validation,
            LeadError::NotPostable { .. }
            | LeadError::NotPurchasable { .. }
            | LeadError::IllegalTransition { .. } => ErrorKind::Conflict,
            LeadError::Repository(err) => err.kind(),
        }
    }
}
