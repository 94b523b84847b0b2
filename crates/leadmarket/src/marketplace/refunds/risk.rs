//! Refund-abuse heuristics.
//!
//! The score is advisory context for the reviewer, not a gate: no request is
//! auto-approved or auto-denied by score alone.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// More than this many prior requests in the trailing week flags frequency.
const FREQUENT_REQUEST_THRESHOLD: u32 = 2;
const FREQUENT_REQUEST_WINDOW_DAYS: i64 = 7;
const FREQUENT_REQUEST_POINTS: u8 = 30;

/// Lifetime requests over lifetime purchases above this ratio flags rate.
const REFUND_RATE_THRESHOLD: f64 = 0.30;
const REFUND_RATE_POINTS: u8 = 25;

/// Notes shorter than this many characters read as a terse justification.
const TERSE_NOTE_CHARS: usize = 10;
const TERSE_NOTE_POINTS: u8 = 15;

/// Requests filed within a day of purchase flag immediacy.
const IMMEDIATE_GAP_DAYS: i64 = 1;
const IMMEDIATE_GAP_POINTS: u8 = 20;

/// Payments above this amount flag value.
const HIGH_VALUE_CENTS: i64 = 100_00;
const HIGH_VALUE_POINTS: u8 = 10;

pub const MAX_RISK_SCORE: u8 = 100;

/// Named signals feeding the additive score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSignal {
    FrequentRequester,
    HighRefundRate,
    TerseJustification,
    ImmediateRequest,
    HighValuePayment,
}

impl RiskSignal {
    pub const fn label(self) -> &'static str {
        match self {
            RiskSignal::FrequentRequester => "frequent_requester",
            RiskSignal::HighRefundRate => "high_refund_rate",
            RiskSignal::TerseJustification => "terse_justification",
            RiskSignal::ImmediateRequest => "immediate_request",
            RiskSignal::HighValuePayment => "high_value_payment",
        }
    }
}

/// Discrete contribution to a risk score, kept for reviewer transparency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskComponent {
    pub signal: RiskSignal,
    pub points: u8,
    pub notes: String,
}

/// Snapshot of contractor history and payment facts at request time.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskInputs {
    /// Prior refund requests by this contractor in the trailing 7 days
    /// (the request being created is not counted).
    pub recent_request_count: u32,
    pub lifetime_request_count: u32,
    pub lifetime_purchase_count: u32,
    pub notes: Option<String>,
    pub payment_amount_cents: i64,
    pub purchased_at: DateTime<Utc>,
    pub requested_at: DateTime<Utc>,
}

/// Result of scoring one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub components: Vec<RiskComponent>,
}

/// Deterministic additive score over the request snapshot, capped at 100.
pub fn score_request(inputs: &RiskInputs) -> RiskAssessment {
    let mut components = Vec::new();
    let mut total: u32 = 0;

    if inputs.recent_request_count > FREQUENT_REQUEST_THRESHOLD {
        components.push(RiskComponent {
            signal: RiskSignal::FrequentRequester,
            points: FREQUENT_REQUEST_POINTS,
            notes: format!(
                "{} refund requests in the trailing {} days",
                inputs.recent_request_count, FREQUENT_REQUEST_WINDOW_DAYS
            ),
        });
        total += u32::from(FREQUENT_REQUEST_POINTS);
    }

    // Ratio is undefined with no recorded purchases; the payment lookup
    // normally guarantees at least one before scoring runs.
    if inputs.lifetime_purchase_count > 0 {
        let rate =
            f64::from(inputs.lifetime_request_count) / f64::from(inputs.lifetime_purchase_count);
        if rate > REFUND_RATE_THRESHOLD {
            components.push(RiskComponent {
                signal: RiskSignal::HighRefundRate,
                points: REFUND_RATE_POINTS,
                notes: format!(
                    "{} requests over {} purchases ({:.0}%)",
                    inputs.lifetime_request_count,
                    inputs.lifetime_purchase_count,
                    rate * 100.0
                ),
            });
            total += u32::from(REFUND_RATE_POINTS);
        }
    }

    if let Some(notes) = &inputs.notes {
        let length = notes.trim().chars().count();
        if length < TERSE_NOTE_CHARS {
            components.push(RiskComponent {
                signal: RiskSignal::TerseJustification,
                points: TERSE_NOTE_POINTS,
                notes: format!("justification is {length} characters"),
            });
            total += u32::from(TERSE_NOTE_POINTS);
        }
    }

    let gap = inputs.requested_at - inputs.purchased_at;
    if gap < Duration::days(IMMEDIATE_GAP_DAYS) {
        components.push(RiskComponent {
            signal: RiskSignal::ImmediateRequest,
            points: IMMEDIATE_GAP_POINTS,
            notes: format!("requested {} hours after purchase", gap.num_hours()),
        });
        total += u32::from(IMMEDIATE_GAP_POINTS);
    }

    if inputs.payment_amount_cents > HIGH_VALUE_CENTS {
        components.push(RiskComponent {
            signal: RiskSignal::HighValuePayment,
            points: HIGH_VALUE_POINTS,
            notes: format!(
                "payment of ${}.{:02}",
                inputs.payment_amount_cents / 100,
                inputs.payment_amount_cents % 100
            ),
        });
        total += u32::from(HIGH_VALUE_POINTS);
    }

    RiskAssessment {
        score: total.min(u32::from(MAX_RISK_SCORE)) as u8,
        components,
    }
}
