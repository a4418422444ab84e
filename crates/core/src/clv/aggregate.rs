//! Assembles engine input from the raw records a CRM keeps per company.
//!
//! This is where the engine's preconditions are enforced: a blank company id
//! or a company without deals is rejected here, so the engine itself never
//! sees either.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::client::{CompanyId, RawClientMetrics};
use crate::errors::DomainError;

pub const DEFAULT_MISSING_FOLLOW_UP_DAYS: i64 = 365;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealRecord {
    pub company_id: CompanyId,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicketRecord {
    pub company_id: CompanyId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub company_id: CompanyId,
    pub progress: Option<String>,
    pub health_score: Option<Decimal>,
    pub delivered: bool,
    pub last_follow_up_at: Option<DateTime<Utc>>,
}

/// Everything fetched for one company ahead of an evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientActivity {
    pub company_id: CompanyId,
    #[serde(default)]
    pub deals: Vec<DealRecord>,
    #[serde(default)]
    pub support_tickets: Vec<SupportTicketRecord>,
    #[serde(default)]
    pub review: Option<ReviewRecord>,
}

/// Whole days since the last follow-up, or `missing_days` when none was ever
/// recorded. Future timestamps come back negative; normalization clamps them.
pub fn days_since_follow_up(
    last_follow_up_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    missing_days: i64,
) -> i64 {
    match last_follow_up_at {
        Some(timestamp) => (now - timestamp).num_days(),
        None => missing_days,
    }
}

pub fn assemble(
    activity: &ClientActivity,
    now: DateTime<Utc>,
    missing_days: i64,
) -> Result<RawClientMetrics, DomainError> {
    if activity.company_id.is_blank() {
        return Err(DomainError::MissingCompanyId);
    }

    let company_id = &activity.company_id;
    let deals: Vec<&DealRecord> =
        activity.deals.iter().filter(|deal| &deal.company_id == company_id).collect();
    if deals.is_empty() {
        return Err(DomainError::NoDealRecords { company_id: company_id.to_string() });
    }

    let total_revenue = deals
        .iter()
        .try_fold(Decimal::ZERO, |total, deal| total.checked_add(deal.amount))
        .unwrap_or(Decimal::MAX);
    let support_ticket_count = activity
        .support_tickets
        .iter()
        .filter(|ticket| &ticket.company_id == company_id)
        .count();

    let review = activity.review.as_ref().filter(|review| &review.company_id == company_id);
    let last_follow_up_at = review.and_then(|review| review.last_follow_up_at);

    Ok(RawClientMetrics {
        company_id: company_id.clone(),
        total_revenue: Value::String(total_revenue.to_string()),
        support_ticket_count: Value::from(support_ticket_count),
        client_health_score: review
            .and_then(|review| review.health_score)
            .map(|score| Value::String(score.to_string()))
            .unwrap_or(Value::Null),
        days_since_follow_up: Value::from(days_since_follow_up(
            last_follow_up_at,
            now,
            missing_days,
        )),
        progress: review
            .and_then(|review| review.progress.clone())
            .map(Value::String)
            .unwrap_or(Value::Null),
        delivered: Value::Bool(review.map(|review| review.delivered).unwrap_or(false)),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        assemble, days_since_follow_up, ClientActivity, DealRecord, ReviewRecord,
        SupportTicketRecord, DEFAULT_MISSING_FOLLOW_UP_DAYS,
    };
    use crate::clv::normalize::normalize;
    use crate::domain::client::{CompanyId, Progress};
    use crate::errors::DomainError;

    fn company(id: &str) -> CompanyId {
        CompanyId(id.to_string())
    }

    fn deal(id: &str, amount: i64) -> DealRecord {
        DealRecord { company_id: company(id), amount: Decimal::from(amount) }
    }

    fn ticket(id: &str) -> SupportTicketRecord {
        SupportTicketRecord { company_id: company(id) }
    }

    #[test]
    fn never_followed_up_counts_as_very_stale() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid timestamp");
        assert_eq!(days_since_follow_up(None, now, DEFAULT_MISSING_FOLLOW_UP_DAYS), 365);
        assert_eq!(days_since_follow_up(Some(now - Duration::days(12)), now, 365), 12);
        assert_eq!(days_since_follow_up(Some(now + Duration::days(3)), now, 365), -3);
    }

    #[test]
    fn assembles_matching_records_only() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid timestamp");
        let activity = ClientActivity {
            company_id: company("acme"),
            deals: vec![deal("acme", 400_000), deal("acme", 200_000), deal("globex", 9_999)],
            support_tickets: vec![ticket("acme"), ticket("globex"), ticket("globex")],
            review: Some(ReviewRecord {
                company_id: company("acme"),
                progress: Some("Excellent".to_string()),
                health_score: Some(Decimal::from(90)),
                delivered: true,
                last_follow_up_at: Some(now - Duration::days(10)),
            }),
        };

        let raw = assemble(&activity, now, 365).expect("acme has deals");
        assert_eq!(raw.support_ticket_count, json!(1));
        assert_eq!(raw.days_since_follow_up, json!(10));

        let metrics = normalize(&raw);
        assert_eq!(metrics.total_revenue, Decimal::from(600_000));
        assert_eq!(metrics.client_health_score, Decimal::from(90));
        assert_eq!(metrics.progress, Progress::Excellent);
        assert!(metrics.delivered);
    }

    #[test]
    fn missing_review_leaves_defaults_to_normalization() {
        let now = Utc::now();
        let activity = ClientActivity {
            company_id: company("acme"),
            deals: vec![deal("acme", 1_000)],
            support_tickets: Vec::new(),
            review: None,
        };

        let metrics = normalize(&assemble(&activity, now, 365).expect("acme has deals"));
        assert_eq!(metrics.client_health_score, Decimal::from(50));
        assert_eq!(metrics.days_since_follow_up, 365);
        assert_eq!(metrics.progress, Progress::Average);
        assert!(!metrics.delivered);
    }

    #[test]
    fn future_follow_up_collapses_to_zero_days() {
        let now = Utc::now();
        let activity = ClientActivity {
            company_id: company("acme"),
            deals: vec![deal("acme", 1_000)],
            support_tickets: Vec::new(),
            review: Some(ReviewRecord {
                company_id: company("acme"),
                progress: None,
                health_score: None,
                delivered: false,
                last_follow_up_at: Some(now + Duration::days(30)),
            }),
        };

        let metrics = normalize(&assemble(&activity, now, 365).expect("acme has deals"));
        assert_eq!(metrics.days_since_follow_up, 0);
    }

    #[test]
    fn rejects_blank_company_and_companies_without_deals() {
        let now = Utc::now();
        let blank = ClientActivity {
            company_id: company("  "),
            deals: vec![deal("  ", 10)],
            support_tickets: Vec::new(),
            review: None,
        };
        assert_eq!(assemble(&blank, now, 365), Err(DomainError::MissingCompanyId));

        let no_deals = ClientActivity {
            company_id: company("acme"),
            deals: vec![deal("globex", 10)],
            support_tickets: vec![ticket("acme")],
            review: None,
        };
        assert_eq!(
            assemble(&no_deals, now, 365),
            Err(DomainError::NoDealRecords { company_id: "acme".to_string() })
        );
    }
}
