use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::audit::assemble_audit;
use super::domain::{BrokerHealthAudit, HealthScore};
use super::repository::BrokerStatsRepository;
use super::score::calculate_health;
use crate::error::ErrorKind;
use crate::marketplace::storage::RepositoryError;

/// Read-then-compute facade over the scoring engine; performs no writes.
pub struct HealthService<R> {
    stats: Arc<R>,
}

impl<R> HealthService<R>
where
    R: BrokerStatsRepository + 'static,
{
    pub fn new(stats: Arc<R>) -> Self {
        Self { stats }
    }

    pub fn score(&self, broker_id: &str, now: DateTime<Utc>) -> Result<HealthScore, HealthError> {
        let summary = self
            .stats
            .summary(broker_id)?
            .ok_or_else(|| HealthError::BrokerNotFound(broker_id.to_string()))?;
        Ok(calculate_health(&summary, now))
    }

    pub fn audit(
        &self,
        broker_id: &str,
        now: DateTime<Utc>,
    ) -> Result<BrokerHealthAudit, HealthError> {
        let aggregates = self
            .stats
            .audit_snapshot(broker_id, now)?
            .ok_or_else(|| HealthError::BrokerNotFound(broker_id.to_string()))?;
        let score = calculate_health(&aggregates.summary, now);
        Ok(assemble_audit(aggregates, score))
    }
}

/// Error raised by the broker health service.
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("broker '{0}' not found")]
    BrokerNotFound(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl HealthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HealthError::BrokerNotFound(_) => ErrorKind::NotFound,
            HealthError::Repository(err) => err.kind(),
        }
    }
}
