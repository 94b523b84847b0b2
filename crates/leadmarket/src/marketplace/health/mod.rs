//! Broker health: deterministic weighted scoring and the operations audit.

pub mod audit;
pub mod domain;
pub mod repository;
pub mod router;
pub mod score;
pub mod service;

#[cfg(test)]
mod tests;

pub use audit::assemble_audit;
pub use domain::{
    AlertSeverity, BrokerAuditAggregates, BrokerHealthAudit, BrokerSummary, ContractorEngagement,
    HealthAlert, HealthScore, RiskLevel,
};
pub use repository::BrokerStatsRepository;
pub use router::health_router;
pub use score::calculate_health;
pub use service::{HealthError, HealthService};
