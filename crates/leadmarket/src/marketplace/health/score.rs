//! Bucketed sub-scores and the weighted composite.
//!
//! Each sub-score is a named pure function over one slice of the summary so
//! thresholds can be tuned and tested without touching orchestration.

use chrono::{DateTime, Utc};

use super::domain::{BrokerSummary, HealthScore, RiskLevel};

const ACTIVITY_WEIGHT: f64 = 0.30;
const CONVERSION_WEIGHT: f64 = 0.25;
const STICKINESS_WEIGHT: f64 = 0.20;
const NETWORK_WEIGHT: f64 = 0.15;
const REVENUE_WEIGHT: f64 = 0.10;

const LOW_RISK_FLOOR: u8 = 70;
const MEDIUM_RISK_FLOOR: u8 = 40;

/// Posting volume buckets.
pub fn activity_score(leads_posted: u32) -> u8 {
    match leads_posted {
        n if n >= 30 => 100,
        n if n >= 16 => 80,
        n if n >= 6 => 60,
        n if n >= 1 => 40,
        _ => 0,
    }
}

/// Close-rate buckets; a broker with nothing posted scores zero.
pub fn conversion_score(leads_posted: u32, leads_closed: u32) -> u8 {
    if leads_posted == 0 {
        return 0;
    }
    let rate = f64::from(leads_closed) / f64::from(leads_posted);
    if rate >= 0.50 {
        100
    } else if rate >= 0.30 {
        85
    } else if rate >= 0.20 {
        70
    } else if rate >= 0.10 {
        50
    } else if rate > 0.0 {
        30
    } else {
        0
    }
}

/// Recency buckets, with a bonus tier for recent activity on an
/// established account. A broker with no recorded activity lands in the
/// stalest bucket.
pub fn stickiness_score(
    last_activity: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> u8 {
    let days_idle = match last_activity {
        Some(at) => (now - at).num_days(),
        None => i64::MAX,
    };
    let account_age_days = (now - created_at).num_days();

    if days_idle <= 7 {
        if account_age_days > 30 {
            100
        } else {
            85
        }
    } else if days_idle <= 14 {
        70
    } else if days_idle <= 30 {
        50
    } else {
        20
    }
}

/// Network size and role-diversity buckets.
pub fn network_score(network_size: u32, role_diversity: u32) -> u8 {
    if network_size >= 10 && role_diversity == 3 {
        100
    } else if network_size >= 6 {
        80
    } else if network_size >= 3 {
        60
    } else if network_size >= 1 {
        40
    } else {
        0
    }
}

/// Earned-revenue buckets (cents).
pub fn revenue_score(revenue_cents: i64) -> u8 {
    if revenue_cents >= 5_000_00 {
        100
    } else if revenue_cents >= 1_000_00 {
        85
    } else if revenue_cents >= 500_00 {
        70
    } else if revenue_cents >= 100_00 {
        50
    } else if revenue_cents > 0 {
        30
    } else {
        0
    }
}

/// Weighted, rounded composite of the five sub-scores.
pub fn overall_score(
    activity: u8,
    conversion: u8,
    stickiness: u8,
    network_quality: u8,
    revenue_trend: u8,
) -> u8 {
    let weighted = f64::from(activity) * ACTIVITY_WEIGHT
        + f64::from(conversion) * CONVERSION_WEIGHT
        + f64::from(stickiness) * STICKINESS_WEIGHT
        + f64::from(network_quality) * NETWORK_WEIGHT
        + f64::from(revenue_trend) * REVENUE_WEIGHT;
    weighted.round() as u8
}

/// Coarse triage bucket from the overall score.
pub fn risk_level(overall: u8) -> RiskLevel {
    if overall >= LOW_RISK_FLOOR {
        RiskLevel::Low
    } else if overall >= MEDIUM_RISK_FLOOR {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Deterministic, pure composite over one summary snapshot.
pub fn calculate_health(summary: &BrokerSummary, now: DateTime<Utc>) -> HealthScore {
    let activity = activity_score(summary.leads_posted);
    let conversion = conversion_score(summary.leads_posted, summary.leads_closed);
    let stickiness = stickiness_score(summary.last_activity, summary.created_at, now);
    let network_quality = network_score(summary.network_size(), summary.role_diversity());
    let revenue_trend = revenue_score(summary.revenue_cents);
    let overall = overall_score(activity, conversion, stickiness, network_quality, revenue_trend);

    HealthScore {
        activity,
        conversion,
        stickiness,
        network_quality,
        revenue_trend,
        overall,
        risk_level: risk_level(overall),
    }
}
