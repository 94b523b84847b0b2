use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Args;

use leadmarket::config::MarketplaceConfig;
use leadmarket::error::AppError;
use leadmarket::marketplace::health::{calculate_health, BrokerSummary, HealthService};
use leadmarket::marketplace::leads::{LeadDraft, LeadService};
use leadmarket::marketplace::refunds::{
    LeadKind, ReasonCategory, RefundClaim, RefundService,
};

use crate::infra::{BrokerRecord, LoggingEventPublisher, MemoryStore, StubPaymentGateway};

#[derive(Args, Debug)]
pub(crate) struct HealthScoreArgs {
    /// Total leads the broker has posted
    #[arg(long)]
    pub(crate) leads_posted: u32,
    /// Total leads that closed
    #[arg(long)]
    pub(crate) leads_closed: u32,
    /// Revenue earned, in cents
    #[arg(long)]
    pub(crate) revenue_cents: i64,
    /// Contractors in the broker's network
    #[arg(long, default_value_t = 0)]
    pub(crate) contractors: u32,
    /// HES assessors in the broker's network
    #[arg(long, default_value_t = 0)]
    pub(crate) hes_assessors: u32,
    /// Inspectors in the broker's network
    #[arg(long, default_value_t = 0)]
    pub(crate) inspectors: u32,
    /// Days since the broker was last active (omit for never)
    #[arg(long)]
    pub(crate) days_since_activity: Option<i64>,
    /// Age of the broker account in days
    #[arg(long, default_value_t = 365)]
    pub(crate) account_age_days: i64,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Contractor id used for the purchase and refund portion
    #[arg(long, default_value = "ctr-001")]
    pub(crate) contractor: String,
    /// Skip the refund portion of the demo
    #[arg(long)]
    pub(crate) skip_refund: bool,
}

pub(crate) fn run_health_score(args: HealthScoreArgs) -> Result<(), AppError> {
    let now = Utc::now();
    let summary = BrokerSummary {
        broker_id: "cli".to_string(),
        leads_posted: args.leads_posted,
        leads_closed: args.leads_closed,
        revenue_cents: args.revenue_cents,
        contractor_count: args.contractors,
        hes_assessor_count: args.hes_assessors,
        inspector_count: args.inspectors,
        last_activity: args.days_since_activity.map(|days| now - Duration::days(days)),
        created_at: now - Duration::days(args.account_age_days),
    };

    let score = calculate_health(&summary, now);

    println!("Broker health");
    println!("  activity         {:>3}", score.activity);
    println!("  conversion       {:>3}", score.conversion);
    println!("  stickiness       {:>3}", score.stickiness);
    println!("  network quality  {:>3}", score.network_quality);
    println!("  revenue trend    {:>3}", score.revenue_trend);
    println!("  overall          {:>3}", score.overall);
    println!("  risk level       {}", score.risk_level.label());

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let now = Utc::now();
    let store = Arc::new(MemoryStore::default());
    let events = Arc::new(LoggingEventPublisher);
    let gateway = Arc::new(StubPaymentGateway::default());

    store.seed_broker(BrokerRecord {
        broker_id: "brk-001".to_string(),
        created_at: now - Duration::days(120),
        last_activity: Some(now - Duration::days(2)),
        contractor_count: 4,
        hes_assessor_count: 1,
        inspector_count: 1,
    });
    for (job_ref, service_type) in [
        ("job-100", "insulation"),
        ("job-101", "hvac"),
        ("job-102", "air_sealing"),
    ] {
        store.seed_job(job_ref, "brk-001", service_type);
    }

    let leads = LeadService::new(store.clone(), events.clone());
    let refunds = RefundService::new(
        store.clone(),
        store.clone(),
        gateway,
        events,
        &MarketplaceConfig::default(),
    );
    let health = HealthService::new(store.clone());

    println!("== Lead lifecycle ==");
    let mut sold_leads = Vec::new();
    for (job_ref, price_cents) in [("job-100", 45_00), ("job-101", 120_00), ("job-102", 60_00)] {
        let lead = leads
            .create(
                LeadDraft {
                    job_ref: job_ref.to_string(),
                    price_cents,
                    notes: None,
                    service_tags: Default::default(),
                },
                now - Duration::days(6),
            )
            .map_err(demo_failure)?;
        let posted = leads
            .post(&lead.id, now - Duration::days(5))
            .map_err(demo_failure)?;
        println!(
            "  posted {} ({}) at ${}.{:02}",
            posted.id.0,
            job_ref,
            price_cents / 100,
            price_cents % 100
        );
        let sold = leads
            .purchase(&posted.id, &args.contractor, "contractor", now - Duration::days(4))
            .map_err(demo_failure)?;
        println!("  sold   {} to {}", sold.id.0, args.contractor);
        sold_leads.push(sold);
    }

    if !args.skip_refund {
        println!("== Refund workflow ==");
        let disputed = &sold_leads[1];
        let request = refunds
            .request(
                RefundClaim {
                    contractor_id: args.contractor.clone(),
                    lead_id: disputed.id.clone(),
                    lead_kind: LeadKind::Standard,
                    reason: "homeowner number disconnected".to_string(),
                    reason_category: ReasonCategory::BadContactInfo,
                    notes: Some("bad #".to_string()),
                },
                now - Duration::days(3),
            )
            .map_err(demo_failure)?;
        println!(
            "  filed {} (risk score {}, {} signals)",
            request.id.0,
            request.risk_score,
            request.risk_breakdown.len()
        );

        let questioned = refunds
            .request_more_info(
                &request.id,
                "ops-7",
                "Which numbers did you try?",
                now - Duration::days(2),
            )
            .map_err(demo_failure)?;
        println!("  ops asked: {}", questioned.info_requested.as_deref().unwrap_or(""));

        let approved = refunds
            .approve(&request.id, "ops-7", Some("number verified dead".to_string()), now)
            .map_err(demo_failure)?;
        println!("  resolved as {}", approved.status.label());
    }

    println!("== Broker health ==");
    let audit = health.audit("brk-001", now).map_err(demo_failure)?;
    println!(
        "  overall {} ({} risk), {} leads in last 30 days",
        audit.score.overall,
        audit.score.risk_level.label(),
        audit.leads_last_30_days
    );
    for alert in &audit.alerts {
        println!("  alert: {} - {}", alert.topic, alert.detail);
    }

    Ok(())
}

fn demo_failure<E: std::fmt::Display>(error: E) -> AppError {
    AppError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("demo step failed: {error}"),
    ))
}
