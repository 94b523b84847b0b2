use chrono::{DateTime, Utc};

use super::domain::{BrokerAuditAggregates, BrokerSummary};
use crate::marketplace::storage::RepositoryError;

/// Read-only storage abstraction for broker aggregates.
///
/// Each method returns everything the caller needs in one call so the
/// composite score is computed over a single coherent instant; callers must
/// never stitch a score together from separate reads taken at different
/// times.
pub trait BrokerStatsRepository: Send + Sync {
    fn summary(&self, broker_id: &str) -> Result<Option<BrokerSummary>, RepositoryError>;

    /// Summary plus the time-windowed aggregates backing an audit, drawn
    /// from the same snapshot.
    fn audit_snapshot(
        &self,
        broker_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<BrokerAuditAggregates>, RepositoryError>;
}
