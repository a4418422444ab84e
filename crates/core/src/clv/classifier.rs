use rust_decimal::Decimal;

use crate::domain::classification::{Classification, ClassificationResult, ValueCategory};
use crate::domain::client::{ClientMetrics, Progress};

pub const DORMANT_AFTER_DAYS: u32 = 90;
pub const FOLLOW_UP_WINDOW_DAYS: u32 = 30;
pub const UPSELL_MIN_REVENUE: i64 = 500_000;
pub const UPSELL_MIN_HEALTH_SCORE: i64 = 80;
pub const UPSELL_MAX_TICKETS: u32 = 2;
pub const AT_RISK_HEALTH_FLOOR: i64 = 70;
pub const AT_RISK_TICKET_THRESHOLD: u32 = 5;
pub const HIGH_VALUE_ABOVE: i64 = 500_000;
pub const MEDIUM_VALUE_FROM: i64 = 100_000;

pub trait ClientClassifier: Send + Sync {
    fn classify(&self, metrics: &ClientMetrics) -> ClassificationResult;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicClientClassifier;

impl ClientClassifier for DeterministicClientClassifier {
    fn classify(&self, metrics: &ClientMetrics) -> ClassificationResult {
        classify(metrics)
    }
}

/// First matching rule wins: Dormant, Upsell, At Risk, then Top Value.
pub fn classify(metrics: &ClientMetrics) -> ClassificationResult {
    let (classification, reason) = evaluate_rules(metrics);
    ClassificationResult {
        classification,
        reason,
        value_category: value_category(metrics.total_revenue),
    }
}

pub fn value_category(total_revenue: Decimal) -> ValueCategory {
    if total_revenue > Decimal::from(HIGH_VALUE_ABOVE) {
        ValueCategory::HighValue
    } else if total_revenue >= Decimal::from(MEDIUM_VALUE_FROM) {
        ValueCategory::MediumValue
    } else {
        ValueCategory::LowValue
    }
}

fn evaluate_rules(metrics: &ClientMetrics) -> (Classification, String) {
    if metrics.days_since_follow_up > DORMANT_AFTER_DAYS {
        return (
            Classification::Dormant,
            format!(
                "No follow-up in {} days (more than {DORMANT_AFTER_DAYS})",
                metrics.days_since_follow_up
            ),
        );
    }

    let upsell_gaps = upsell_gaps(metrics);
    if upsell_gaps.is_empty() {
        return (
            Classification::Upsell,
            format!(
                "Excellent progress with revenue {}, health score {}, {} support tickets and a follow-up {} days ago",
                metrics.total_revenue,
                metrics.client_health_score,
                metrics.support_ticket_count,
                metrics.days_since_follow_up
            ),
        );
    }

    let red_flags = at_risk_flags(metrics);
    if !red_flags.is_empty() {
        return (Classification::AtRisk, format!("Red flags: {}", red_flags.join("; ")));
    }

    (
        Classification::TopValue,
        format!("Low risk but below the upsell bar: {}", upsell_gaps.join("; ")),
    )
}

/// Upsell conditions the client does not meet. Empty means every one holds.
fn upsell_gaps(metrics: &ClientMetrics) -> Vec<String> {
    let mut gaps = Vec::new();

    if metrics.progress != Progress::Excellent {
        gaps.push(format!("progress is {} rather than Excellent", metrics.progress));
    }
    if metrics.total_revenue < Decimal::from(UPSELL_MIN_REVENUE) {
        gaps.push(format!(
            "revenue {} is below {UPSELL_MIN_REVENUE}",
            metrics.total_revenue
        ));
    }
    if metrics.client_health_score < Decimal::from(UPSELL_MIN_HEALTH_SCORE) {
        gaps.push(format!(
            "health score {} is below {UPSELL_MIN_HEALTH_SCORE}",
            metrics.client_health_score
        ));
    }
    if metrics.support_ticket_count > UPSELL_MAX_TICKETS {
        gaps.push(format!(
            "{} support tickets exceed {UPSELL_MAX_TICKETS}",
            metrics.support_ticket_count
        ));
    }
    if metrics.days_since_follow_up > FOLLOW_UP_WINDOW_DAYS {
        gaps.push(format!(
            "last follow-up {} days ago exceeds {FOLLOW_UP_WINDOW_DAYS}",
            metrics.days_since_follow_up
        ));
    }

    gaps
}

fn at_risk_flags(metrics: &ClientMetrics) -> Vec<String> {
    let mut flags = Vec::new();

    if metrics.progress == Progress::Poor {
        flags.push("progress rated Poor".to_string());
    }
    if metrics.client_health_score < Decimal::from(AT_RISK_HEALTH_FLOOR) {
        flags.push(format!(
            "health score {} is below {AT_RISK_HEALTH_FLOOR}",
            metrics.client_health_score
        ));
    }
    if metrics.support_ticket_count >= AT_RISK_TICKET_THRESHOLD {
        flags.push(format!(
            "{} support tickets (threshold {AT_RISK_TICKET_THRESHOLD})",
            metrics.support_ticket_count
        ));
    }
    if metrics.days_since_follow_up > FOLLOW_UP_WINDOW_DAYS {
        flags.push(format!(
            "last follow-up {} days ago (more than {FOLLOW_UP_WINDOW_DAYS})",
            metrics.days_since_follow_up
        ));
    }

    flags
}
