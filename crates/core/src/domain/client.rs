use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub String);

impl CompanyId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Qualitative engagement rating captured on a client review.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Progress {
    Excellent,
    Good,
    #[default]
    Average,
    Poor,
}

impl Progress {
    /// Case and whitespace insensitive. Anything unrecognized rates as `Average`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "excellent" => Self::Excellent,
            "good" => Self::Good,
            "poor" => Self::Poor,
            _ => Self::Average,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::Poor => "Poor",
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical client aggregates. Only produced by normalization, so every
/// field is already inside its valid range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetrics {
    pub company_id: CompanyId,
    pub total_revenue: Decimal,
    pub support_ticket_count: u32,
    pub client_health_score: Decimal,
    pub days_since_follow_up: u32,
    pub progress: Progress,
    /// Caller's original rating text, kept for display.
    pub progress_label: String,
    pub delivered: bool,
}

/// Lenient wire form of [`ClientMetrics`]. Callers send whatever their
/// storage layer produced; normalization decides what each value means.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawClientMetrics {
    pub company_id: CompanyId,
    pub total_revenue: Value,
    pub support_ticket_count: Value,
    pub client_health_score: Value,
    pub days_since_follow_up: Value,
    pub progress: Value,
    pub delivered: Value,
}

impl Default for CompanyId {
    fn default() -> Self {
        Self(String::new())
    }
}

impl From<&ClientMetrics> for RawClientMetrics {
    fn from(metrics: &ClientMetrics) -> Self {
        Self {
            company_id: metrics.company_id.clone(),
            total_revenue: Value::String(metrics.total_revenue.to_string()),
            support_ticket_count: Value::from(metrics.support_ticket_count),
            client_health_score: Value::String(metrics.client_health_score.to_string()),
            days_since_follow_up: Value::from(metrics.days_since_follow_up),
            progress: Value::String(metrics.progress_label.clone()),
            delivered: Value::Bool(metrics.delivered),
        }
    }
}
