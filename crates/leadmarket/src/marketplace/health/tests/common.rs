use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::marketplace::health::domain::{
    BrokerAuditAggregates, BrokerSummary, ContractorEngagement,
};
use crate::marketplace::health::repository::BrokerStatsRepository;
use crate::marketplace::health::service::HealthService;
use crate::marketplace::storage::RepositoryError;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn healthy_summary() -> BrokerSummary {
    BrokerSummary {
        broker_id: "brk-001".to_string(),
        leads_posted: 20,
        leads_closed: 8,
        revenue_cents: 1_200_00,
        contractor_count: 4,
        hes_assessor_count: 1,
        inspector_count: 1,
        last_activity: Some(now() - Duration::days(3)),
        created_at: now() - Duration::days(90),
    }
}

pub(super) fn healthy_aggregates() -> BrokerAuditAggregates {
    let mut revenue_by_service_cents = BTreeMap::new();
    revenue_by_service_cents.insert("insulation".to_string(), 800_00);
    revenue_by_service_cents.insert("hvac".to_string(), 400_00);

    BrokerAuditAggregates {
        summary: healthy_summary(),
        leads_last_30_days: 6,
        leads_last_7_days: 2,
        days_to_close: vec![4, 6, 11],
        revenue_by_service_cents,
        contractor_engagement: vec![
            ContractorEngagement {
                contractor_id: "ctr-001".to_string(),
                leads_sent: 12,
                leads_closed: 5,
            },
            ContractorEngagement {
                contractor_id: "ctr-002".to_string(),
                leads_sent: 8,
                leads_closed: 3,
            },
        ],
    }
}

#[derive(Default)]
pub(super) struct MemoryStats {
    snapshots: Mutex<Vec<BrokerAuditAggregates>>,
}

impl MemoryStats {
    pub(super) fn seed(&self, aggregates: BrokerAuditAggregates) {
        self.snapshots
            .lock()
            .expect("stats mutex poisoned")
            .push(aggregates);
    }
}

impl BrokerStatsRepository for MemoryStats {
    fn summary(&self, broker_id: &str) -> Result<Option<BrokerSummary>, RepositoryError> {
        let guard = self.snapshots.lock().expect("stats mutex poisoned");
        Ok(guard
            .iter()
            .find(|aggregates| aggregates.summary.broker_id == broker_id)
            .map(|aggregates| aggregates.summary.clone()))
    }

    fn audit_snapshot(
        &self,
        broker_id: &str,
        _now: DateTime<Utc>,
    ) -> Result<Option<BrokerAuditAggregates>, RepositoryError> {
        let guard = self.snapshots.lock().expect("stats mutex poisoned");
        Ok(guard
            .iter()
            .find(|aggregates| aggregates.summary.broker_id == broker_id)
            .cloned())
    }
}

pub(super) fn build_service() -> (HealthService<MemoryStats>, Arc<MemoryStats>) {
    let stats = Arc::new(MemoryStats::default());
    let service = HealthService::new(stats.clone());
    (service, stats)
}
