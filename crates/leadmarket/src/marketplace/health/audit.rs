//! Audit bundle assembly and derived advisory alerts.

use super::domain::{
    AlertSeverity, BrokerAuditAggregates, BrokerHealthAudit, BrokerSummary, HealthAlert,
    HealthScore,
};

const LOW_ACTIVITY_FLOOR: u8 = 40;
const POOR_CONVERSION_FLOOR: u8 = 50;
const STALE_BROKER_FLOOR: u8 = 50;

/// Build the audit bundle from one consistent aggregate snapshot.
///
/// Alerts are regenerated from current inputs on every call; nothing here
/// is persisted.
pub fn assemble_audit(aggregates: BrokerAuditAggregates, score: HealthScore) -> BrokerHealthAudit {
    let alerts = derive_alerts(&score, &aggregates.summary);
    let average_days_to_close = if aggregates.days_to_close.is_empty() {
        0.0
    } else {
        aggregates.days_to_close.iter().sum::<i64>() as f64 / aggregates.days_to_close.len() as f64
    };

    BrokerHealthAudit {
        broker_id: aggregates.summary.broker_id,
        score,
        leads_last_30_days: aggregates.leads_last_30_days,
        leads_last_7_days: aggregates.leads_last_7_days,
        average_days_to_close,
        revenue_by_service_cents: aggregates.revenue_by_service_cents,
        contractor_engagement: aggregates.contractor_engagement,
        alerts,
    }
}

pub(crate) fn derive_alerts(score: &HealthScore, summary: &BrokerSummary) -> Vec<HealthAlert> {
    let mut alerts = Vec::new();

    if score.activity <= LOW_ACTIVITY_FLOOR {
        alerts.push(HealthAlert {
            topic: "low_activity",
            detail: format!("only {} leads posted", summary.leads_posted),
            severity: AlertSeverity::Warning,
        });
    }

    if score.conversion <= POOR_CONVERSION_FLOOR {
        alerts.push(HealthAlert {
            topic: "poor_conversion",
            detail: format!(
                "{} of {} posted leads closed",
                summary.leads_closed, summary.leads_posted
            ),
            severity: AlertSeverity::Warning,
        });
    }

    if score.stickiness <= STALE_BROKER_FLOOR {
        let detail = match summary.last_activity {
            Some(at) => format!("last active {}", at.format("%Y-%m-%d")),
            None => "no recorded activity".to_string(),
        };
        alerts.push(HealthAlert {
            topic: "stale_broker",
            detail,
            severity: AlertSeverity::Warning,
        });
    }

    if summary.inspector_count == 0 {
        alerts.push(HealthAlert {
            topic: "no_inspectors",
            detail: "no inspectors in network".to_string(),
            severity: AlertSeverity::Notice,
        });
    }
    if summary.hes_assessor_count == 0 {
        alerts.push(HealthAlert {
            topic: "no_hes_assessors",
            detail: "no HES assessors in network".to_string(),
            severity: AlertSeverity::Notice,
        });
    }
    if summary.contractor_count == 0 {
        alerts.push(HealthAlert {
            topic: "no_contractors",
            detail: "no contractors in network".to_string(),
            severity: AlertSeverity::Warning,
        });
    }

    if summary.revenue_cents == 0 {
        alerts.push(HealthAlert {
            topic: "no_revenue",
            detail: "no revenue earned to date".to_string(),
            severity: AlertSeverity::Notice,
        });
    }

    alerts
}
