use chrono::{DateTime, Utc};

use super::domain::{BuyerType, Lead, LeadId};
use crate::marketplace::storage::RepositoryError;

/// Storage abstraction for leads so the service module can be exercised in
/// isolation.
///
/// `claim_for_purchase` is the one call with a concurrency contract: it must
/// be an atomic conditional update (`status = active` and no buyer assigned)
/// whose affected-row count decides the winner. A `None` return means zero
/// rows matched, never silent success.
pub trait LeadRepository: Send + Sync {
    /// Whether the owning job reference resolves in the backing store.
    fn job_exists(&self, job_ref: &str) -> Result<bool, RepositoryError>;

    fn insert(&self, lead: Lead) -> Result<Lead, RepositoryError>;

    fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError>;

    fn update(&self, lead: Lead) -> Result<(), RepositoryError>;

    /// Compare-and-swap purchase: assign the buyer and mark the lead sold
    /// only if it is still `active` with `buyer_id` unset.
    fn claim_for_purchase(
        &self,
        id: &LeadId,
        buyer_id: &str,
        buyer_type: BuyerType,
        sold_at: DateTime<Utc>,
    ) -> Result<Option<Lead>, RepositoryError>;

    fn delete(&self, id: &LeadId) -> Result<bool, RepositoryError>;
}
