use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::client::Progress;
use crate::domain::pricing::{DiscountBreakdown, PricingInput, PricingRecommendation};

pub const MAX_DISCOUNT_PCT: u8 = 50;
pub const DELIVERY_BONUS_PCT: u8 = 15;
pub const DEFAULT_CONFIDENCE: u8 = 70;
pub const HIGH_CONFIDENCE: u8 = 90;
pub const LOW_CONFIDENCE: u8 = 50;

pub trait PricingAdvisor: Send + Sync {
    fn recommend(&self, input: &PricingInput) -> PricingRecommendation;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicPricingAdvisor;

impl PricingAdvisor for DeterministicPricingAdvisor {
    fn recommend(&self, input: &PricingInput) -> PricingRecommendation {
        recommend_pricing(input)
    }
}

pub fn recommend_pricing(input: &PricingInput) -> PricingRecommendation {
    let breakdown = discount_breakdown(input);
    let recommended_discount = round_whole(breakdown.average_discount)
        .to_u8()
        .unwrap_or(MAX_DISCOUNT_PCT)
        .min(MAX_DISCOUNT_PCT);

    let retained_share =
        Decimal::from(100 - u32::from(recommended_discount)) / Decimal::ONE_HUNDRED;
    let suggested_min_price = round_whole(scale(input.total_revenue, retained_share));
    let suggested_max_price = round_whole(scale(input.total_revenue, Decimal::new(11, 1)));

    PricingRecommendation {
        suggested_min_price,
        suggested_max_price,
        recommended_discount,
        confidence_score: confidence_score(input),
        breakdown,
    }
}

/// Simple mean of the four sub-scores, unweighted.
pub fn discount_breakdown(input: &PricingInput) -> DiscountBreakdown {
    let progress_discount = progress_discount(input.progress);
    let support_discount = support_discount(input.support_ticket_count);
    let health_discount = health_discount(input.client_health_score);
    let delivery_bonus = if input.delivered { DELIVERY_BONUS_PCT } else { 0 };

    let sum = u32::from(progress_discount)
        + u32::from(support_discount)
        + u32::from(health_discount)
        + u32::from(delivery_bonus);

    DiscountBreakdown {
        progress_discount,
        support_discount,
        health_discount,
        delivery_bonus,
        average_discount: Decimal::from(sum) / Decimal::from(4),
    }
}

/// Raise runs first, lower runs second and overwrites it.
pub fn confidence_score(input: &PricingInput) -> u8 {
    let mut confidence = DEFAULT_CONFIDENCE;

    if input.support_ticket_count < 3 && input.progress == Progress::Excellent {
        confidence = HIGH_CONFIDENCE;
    }
    if input.support_ticket_count > 10 || input.progress == Progress::Poor {
        confidence = LOW_CONFIDENCE;
    }

    confidence
}

fn progress_discount(progress: Progress) -> u8 {
    match progress {
        Progress::Excellent | Progress::Good => 30,
        Progress::Average => 20,
        Progress::Poor => 0,
    }
}

fn support_discount(support_ticket_count: u32) -> u8 {
    match support_ticket_count {
        count if count > 10 => 0,
        count if count > 5 => 20,
        _ => 30,
    }
}

fn health_discount(client_health_score: Decimal) -> u8 {
    if client_health_score > Decimal::from(75) {
        30
    } else if client_health_score > Decimal::from(50) {
        20
    } else {
        0
    }
}

fn scale(amount: Decimal, factor: Decimal) -> Decimal {
    amount.checked_mul(factor).unwrap_or(Decimal::MAX)
}

// Inputs are never negative, so away-from-zero behaves as round-half-up.
fn round_whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        confidence_score, discount_breakdown, recommend_pricing, DeterministicPricingAdvisor,
        PricingAdvisor,
    };
    use crate::clv::normalize::normalize;
    use crate::domain::client::{Progress, RawClientMetrics};
    use crate::domain::pricing::PricingInput;

    fn input(
        revenue: i64,
        tickets: u32,
        health: i64,
        progress: Progress,
        delivered: bool,
    ) -> PricingInput {
        PricingInput {
            progress,
            support_ticket_count: tickets,
            client_health_score: Decimal::from(health),
            total_revenue: Decimal::from(revenue),
            delivered,
        }
    }

    #[test]
    fn delivered_good_client_gets_twenty_six_percent() {
        let recommendation = recommend_pricing(&input(200_000, 1, 80, Progress::Good, true));

        assert_eq!(recommendation.breakdown.progress_discount, 30);
        assert_eq!(recommendation.breakdown.support_discount, 30);
        assert_eq!(recommendation.breakdown.health_discount, 30);
        assert_eq!(recommendation.breakdown.delivery_bonus, 15);
        assert_eq!(recommendation.breakdown.average_discount, Decimal::new(2625, 2));
        assert_eq!(recommendation.recommended_discount, 26);
        assert_eq!(recommendation.suggested_min_price, Decimal::from(148_000));
        assert_eq!(recommendation.suggested_max_price, Decimal::from(220_000));
        assert_eq!(recommendation.confidence_score, 70);
    }

    #[test]
    fn half_percent_averages_round_up() {
        let recommendation = recommend_pricing(&input(12_345, 0, 90, Progress::Excellent, false));

        assert_eq!(recommendation.breakdown.average_discount, Decimal::new(225, 1));
        assert_eq!(recommendation.recommended_discount, 23);
        assert_eq!(recommendation.suggested_min_price, Decimal::from(9_506));
        assert_eq!(recommendation.suggested_max_price, Decimal::from(13_580));
    }

    #[test]
    fn support_discount_tiers() {
        let tier = |tickets| discount_breakdown(&input(0, tickets, 0, Progress::Poor, false));

        assert_eq!(tier(0).support_discount, 30);
        assert_eq!(tier(5).support_discount, 30);
        assert_eq!(tier(6).support_discount, 20);
        assert_eq!(tier(10).support_discount, 20);
        assert_eq!(tier(11).support_discount, 0);
    }

    #[test]
    fn health_discount_tiers_are_strict() {
        let tier = |health| discount_breakdown(&input(0, 0, health, Progress::Poor, false));

        assert_eq!(tier(76).health_discount, 30);
        assert_eq!(tier(75).health_discount, 20);
        assert_eq!(tier(51).health_discount, 20);
        assert_eq!(tier(50).health_discount, 0);
    }

    #[test]
    fn unrecognized_progress_prices_like_average() {
        let raw = RawClientMetrics { progress: json!("Stellar"), ..RawClientMetrics::default() };
        let metrics = normalize(&raw);

        let breakdown = discount_breakdown(&PricingInput::from(&metrics));
        assert_eq!(breakdown.progress_discount, 20);
    }

    #[test]
    fn confidence_rises_for_clean_excellent_clients() {
        assert_eq!(confidence_score(&input(0, 2, 0, Progress::Excellent, false)), 90);
        assert_eq!(confidence_score(&input(0, 3, 0, Progress::Excellent, false)), 70);
        assert_eq!(confidence_score(&input(0, 0, 0, Progress::Good, false)), 70);
    }

    #[test]
    fn confidence_drops_for_poor_or_noisy_clients() {
        assert_eq!(confidence_score(&input(0, 11, 0, Progress::Good, false)), 50);
        assert_eq!(confidence_score(&input(0, 0, 0, Progress::Poor, false)), 50);
        assert_eq!(confidence_score(&input(0, 10, 0, Progress::Good, false)), 70);
    }

    #[test]
    fn lowering_check_runs_after_raising_check() {
        // Excellent with few tickets raises; the second check can only lower,
        // and it always gets the final word when it fires.
        let raised = input(0, 0, 0, Progress::Excellent, false);
        assert_eq!(confidence_score(&raised), 90);

        for tickets in 0..=20 {
            for progress in [Progress::Excellent, Progress::Good, Progress::Average, Progress::Poor]
            {
                let candidate = input(0, tickets, 0, progress, false);
                let lowered = tickets > 10 || progress == Progress::Poor;
                if lowered {
                    assert_eq!(confidence_score(&candidate), 50);
                }
            }
        }
    }

    #[test]
    fn discount_is_capped_and_price_band_is_ordered() {
        let progresses = [Progress::Excellent, Progress::Good, Progress::Average, Progress::Poor];

        for revenue in [0, 1, 999, 200_000, 10_000_000] {
            for tickets in [0, 5, 6, 10, 11, 40] {
                for health in [0, 50, 51, 75, 76, 100] {
                    for progress in progresses {
                        for delivered in [false, true] {
                            let recommendation = recommend_pricing(&input(
                                revenue, tickets, health, progress, delivered,
                            ));

                            assert!(recommendation.recommended_discount <= 50);
                            assert!(
                                recommendation.suggested_min_price
                                    <= recommendation.suggested_max_price
                            );
                            assert!([50, 70, 90].contains(&recommendation.confidence_score));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn huge_revenue_saturates_instead_of_overflowing() {
        let recommendation = recommend_pricing(&PricingInput {
            total_revenue: Decimal::MAX,
            ..input(0, 0, 0, Progress::Average, false)
        });

        assert_eq!(recommendation.suggested_max_price, Decimal::MAX);
        assert!(recommendation.suggested_min_price <= recommendation.suggested_max_price);
    }

    #[test]
    fn trait_impl_matches_free_function() {
        let pricing_input = input(200_000, 1, 80, Progress::Good, true);
        assert_eq!(
            DeterministicPricingAdvisor.recommend(&pricing_input),
            recommend_pricing(&pricing_input)
        );
    }
}
