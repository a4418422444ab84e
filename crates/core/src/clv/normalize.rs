//! Coerces caller-supplied metrics into [`ClientMetrics`].
//!
//! Normalization never fails. A value that cannot be read as a number takes
//! its field default, so a malformed payload still produces an answer.

use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::domain::client::{ClientMetrics, Progress, RawClientMetrics};

pub const DEFAULT_HEALTH_SCORE: u32 = 50;
pub const MAX_HEALTH_SCORE: u32 = 100;

pub fn normalize(raw: &RawClientMetrics) -> ClientMetrics {
    let total_revenue = coerce_number(&raw.total_revenue).unwrap_or(Decimal::ZERO);
    let support_ticket_count = coerce_number(&raw.support_ticket_count).unwrap_or(Decimal::ZERO);
    let client_health_score = coerce_number(&raw.client_health_score)
        .unwrap_or_else(|| Decimal::from(DEFAULT_HEALTH_SCORE));
    let days_since_follow_up = coerce_number(&raw.days_since_follow_up).unwrap_or(Decimal::ZERO);
    let (progress, progress_label) = normalize_progress(&raw.progress);

    ClientMetrics {
        company_id: raw.company_id.clone(),
        total_revenue: total_revenue.max(Decimal::ZERO).normalize(),
        support_ticket_count: to_count(support_ticket_count),
        client_health_score: clamp_health_score(client_health_score),
        days_since_follow_up: to_count(days_since_follow_up),
        progress,
        progress_label,
        delivered: coerce_flag(&raw.delivered),
    }
}

/// Reads a JSON value as a number. `None` plays the role of NaN.
pub fn coerce_number(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => parse_decimal(&number.to_string())
            .or_else(|| number.as_f64().and_then(saturate_float)),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            parse_decimal(trimmed)
                .or_else(|| trimmed.parse::<f64>().ok().and_then(saturate_float))
        }
        Value::Bool(flag) => Some(if *flag { Decimal::ONE } else { Decimal::ZERO }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn clamp_health_score(score: Decimal) -> Decimal {
    score.clamp(Decimal::ZERO, Decimal::from(MAX_HEALTH_SCORE)).normalize()
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)).ok()
}

// Finite values outside Decimal's range pin to its bounds.
fn saturate_float(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).or(Some(if value > 0.0 { Decimal::MAX } else { Decimal::MIN }))
}

// Whole units only; negative collapses to zero, overflow saturates.
fn to_count(value: Decimal) -> u32 {
    if value <= Decimal::ZERO {
        return 0;
    }
    value.floor().to_u32().unwrap_or(u32::MAX)
}

fn normalize_progress(value: &Value) -> (Progress, String) {
    match value {
        Value::String(text) if !text.trim().is_empty() => {
            let label = text.trim().to_string();
            (Progress::parse(&label), label)
        }
        _ => (Progress::Average, Progress::Average.as_str().to_string()),
    }
}

fn coerce_flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}
