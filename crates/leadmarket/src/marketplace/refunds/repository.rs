use chrono::{DateTime, Utc};

use super::domain::{RefundFilters, RefundRequest, RefundRequestId};
use crate::marketplace::leads::LeadId;
use crate::marketplace::storage::RepositoryError;

/// Storage abstraction over refund requests.
///
/// `insert_pending` owns the duplicate guard: the implementation must
/// serialize the no-pending-request check with the insert (a uniqueness
/// constraint or a row lock scoped to the payment) and answer `Conflict`
/// when a pending request already exists for the (contractor, lead) pair.
pub trait RefundRequestRepository: Send + Sync {
    fn insert_pending(&self, request: RefundRequest) -> Result<RefundRequest, RepositoryError>;

    fn fetch(&self, id: &RefundRequestId) -> Result<Option<RefundRequest>, RepositoryError>;

    fn update(&self, request: RefundRequest) -> Result<(), RepositoryError>;

    fn pending_exists(
        &self,
        contractor_id: &str,
        lead_id: &LeadId,
    ) -> Result<bool, RepositoryError>;

    /// Refund requests filed by this contractor at or after `since`.
    fn count_since(
        &self,
        contractor_id: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, RepositoryError>;

    /// Lifetime refund requests filed by this contractor.
    fn lifetime_count(&self, contractor_id: &str) -> Result<u32, RepositoryError>;

    fn list(&self, filters: &RefundFilters) -> Result<Vec<RefundRequest>, RepositoryError>;
}
