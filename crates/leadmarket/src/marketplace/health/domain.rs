use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated broker statistics, read in one consistent snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerSummary {
    pub broker_id: String,
    pub leads_posted: u32,
    pub leads_closed: u32,
    pub revenue_cents: i64,
    pub contractor_count: u32,
    pub hes_assessor_count: u32,
    pub inspector_count: u32,
    /// `None` means the broker has never been active.
    pub last_activity: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BrokerSummary {
    pub fn network_size(&self) -> u32 {
        self.contractor_count + self.hes_assessor_count + self.inspector_count
    }

    /// How many of the three network roles have at least one member.
    pub fn role_diversity(&self) -> u32 {
        [
            self.contractor_count,
            self.hes_assessor_count,
            self.inspector_count,
        ]
        .iter()
        .filter(|count| **count > 0)
        .count() as u32
    }
}

/// Coarse triage bucket derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Weighted composite of the five sub-scores; recomputed on demand, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthScore {
    pub activity: u8,
    pub conversion: u8,
    pub stickiness: u8,
    pub network_quality: u8,
    pub revenue_trend: u8,
    pub overall: u8,
    pub risk_level: RiskLevel,
}

/// Per-contractor engagement line in the audit bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractorEngagement {
    pub contractor_id: String,
    pub leads_sent: u32,
    pub leads_closed: u32,
}

/// Advisory severity for a derived health alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Notice,
    Warning,
}

/// Qualitative alert regenerated from current inputs on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthAlert {
    pub topic: &'static str,
    pub detail: String,
    pub severity: AlertSeverity,
}

/// Raw windowed aggregates backing one audit, drawn from a single
/// storage snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerAuditAggregates {
    pub summary: BrokerSummary,
    pub leads_last_30_days: u32,
    pub leads_last_7_days: u32,
    /// Days from creation to sale for each closed lead.
    pub days_to_close: Vec<i64>,
    pub revenue_by_service_cents: BTreeMap<String, i64>,
    pub contractor_engagement: Vec<ContractorEngagement>,
}

/// Full audit bundle for operations review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerHealthAudit {
    pub broker_id: String,
    pub score: HealthScore,
    pub leads_last_30_days: u32,
    pub leads_last_7_days: u32,
    pub average_days_to_close: f64,
    pub revenue_by_service_cents: BTreeMap<String, i64>,
    pub contractor_engagement: Vec<ContractorEngagement>,
    pub alerts: Vec<HealthAlert>,
}
