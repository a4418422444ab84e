use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::client::{ClientMetrics, Progress};

/// The slice of [`ClientMetrics`] the pricing calculator reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingInput {
    pub progress: Progress,
    pub support_ticket_count: u32,
    pub client_health_score: Decimal,
    pub total_revenue: Decimal,
    pub delivered: bool,
}

impl From<&ClientMetrics> for PricingInput {
    fn from(metrics: &ClientMetrics) -> Self {
        Self {
            progress: metrics.progress,
            support_ticket_count: metrics.support_ticket_count,
            client_health_score: metrics.client_health_score,
            total_revenue: metrics.total_revenue,
            delivered: metrics.delivered,
        }
    }
}

/// The four sub-scores behind a recommended discount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountBreakdown {
    pub progress_discount: u8,
    pub support_discount: u8,
    pub health_discount: u8,
    pub delivery_bonus: u8,
    pub average_discount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRecommendation {
    pub suggested_min_price: Decimal,
    pub suggested_max_price: Decimal,
    pub recommended_discount: u8,
    pub confidence_score: u8,
    pub breakdown: DiscountBreakdown,
}
