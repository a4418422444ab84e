use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use clientpulse_core::domain::classification::{
    Classification, ClassificationResult, ValueCategory,
};
use clientpulse_core::domain::client::{ClientMetrics, CompanyId};
use clientpulse_core::domain::pricing::{DiscountBreakdown, PricingRecommendation};
use clientpulse_core::domain::profile::ClientProfile;

use super::{ClientProfileRepository, ProfileFilter, RepositoryError, UpsertOutcome};
use crate::DbPool;

const PROFILE_COLUMNS: &str = "company_id, classification, classification_reason, value_category,
        suggested_min_price, suggested_max_price, recommended_discount, confidence_score,
        discount_breakdown_json, metrics_json, evaluated_at, follow_up_anchor_at";

pub struct SqlClientProfileRepository {
    pool: DbPool,
}

impl SqlClientProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// Fixed-width UTC timestamps so SQLite's text comparison orders them correctly.
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_error(error: impl ToString) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| decode_error(format!("{column} `{value}`: {error}")))
}

fn row_to_profile(row: &SqliteRow) -> Result<ClientProfile, RepositoryError> {
    let company_id: String = row.try_get("company_id").map_err(decode_error)?;
    let classification: String = row.try_get("classification").map_err(decode_error)?;
    let reason: String = row.try_get("classification_reason").map_err(decode_error)?;
    let value_category: String = row.try_get("value_category").map_err(decode_error)?;
    let min_price: String = row.try_get("suggested_min_price").map_err(decode_error)?;
    let max_price: String = row.try_get("suggested_max_price").map_err(decode_error)?;
    let recommended_discount: i64 = row.try_get("recommended_discount").map_err(decode_error)?;
    let confidence_score: i64 = row.try_get("confidence_score").map_err(decode_error)?;
    let breakdown_json: String = row.try_get("discount_breakdown_json").map_err(decode_error)?;
    let metrics_json: String = row.try_get("metrics_json").map_err(decode_error)?;
    let evaluated_at: String = row.try_get("evaluated_at").map_err(decode_error)?;
    let follow_up_anchor_at: String =
        row.try_get("follow_up_anchor_at").map_err(decode_error)?;

    let metrics: ClientMetrics = serde_json::from_str(&metrics_json)
        .map_err(|error| decode_error(format!("metrics_json for `{company_id}`: {error}")))?;
    let breakdown: DiscountBreakdown = serde_json::from_str(&breakdown_json).map_err(|error| {
        decode_error(format!("discount_breakdown_json for `{company_id}`: {error}"))
    })?;
    let evaluated_at = parse_timestamp("evaluated_at", &evaluated_at)?;
    let follow_up_anchor_at = parse_timestamp("follow_up_anchor_at", &follow_up_anchor_at)?;

    Ok(ClientProfile {
        company_id: CompanyId(company_id),
        metrics,
        classification: ClassificationResult {
            classification: Classification::from_str(&classification).map_err(decode_error)?,
            reason,
            value_category: ValueCategory::from_str(&value_category).map_err(decode_error)?,
        },
        pricing: PricingRecommendation {
            suggested_min_price: Decimal::from_str(&min_price).map_err(decode_error)?,
            suggested_max_price: Decimal::from_str(&max_price).map_err(decode_error)?,
            recommended_discount: u8::try_from(recommended_discount).map_err(decode_error)?,
            confidence_score: u8::try_from(confidence_score).map_err(decode_error)?,
            breakdown,
        },
        evaluated_at,
        follow_up_anchor_at,
    })
}

#[async_trait::async_trait]
impl ClientProfileRepository for SqlClientProfileRepository {
    async fn upsert(&self, profile: ClientProfile) -> Result<UpsertOutcome, RepositoryError> {
        let metrics_json = serde_json::to_string(&profile.metrics).map_err(decode_error)?;
        let breakdown_json =
            serde_json::to_string(&profile.pricing.breakdown).map_err(decode_error)?;

        let result = sqlx::query(
            "INSERT INTO client_profile (company_id, classification, classification_reason,
                                         value_category, total_revenue, suggested_min_price,
                                         suggested_max_price, recommended_discount,
                                         confidence_score, discount_breakdown_json,
                                         metrics_json, evaluated_at, follow_up_anchor_at,
                                         updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(company_id) DO UPDATE SET
                 classification = excluded.classification,
                 classification_reason = excluded.classification_reason,
                 value_category = excluded.value_category,
                 total_revenue = excluded.total_revenue,
                 suggested_min_price = excluded.suggested_min_price,
                 suggested_max_price = excluded.suggested_max_price,
                 recommended_discount = excluded.recommended_discount,
                 confidence_score = excluded.confidence_score,
                 discount_breakdown_json = excluded.discount_breakdown_json,
                 metrics_json = excluded.metrics_json,
                 evaluated_at = excluded.evaluated_at,
                 follow_up_anchor_at = excluded.follow_up_anchor_at,
                 updated_at = excluded.updated_at
             WHERE excluded.evaluated_at >= client_profile.evaluated_at",
        )
        .bind(profile.company_id.as_str())
        .bind(profile.classification.classification.as_str())
        .bind(&profile.classification.reason)
        .bind(profile.classification.value_category.as_str())
        .bind(profile.metrics.total_revenue.to_string())
        .bind(profile.pricing.suggested_min_price.to_string())
        .bind(profile.pricing.suggested_max_price.to_string())
        .bind(i64::from(profile.pricing.recommended_discount))
        .bind(i64::from(profile.pricing.confidence_score))
        .bind(breakdown_json)
        .bind(metrics_json)
        .bind(format_timestamp(&profile.evaluated_at))
        .bind(format_timestamp(&profile.follow_up_anchor_at))
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(UpsertOutcome::StaleIgnored);
        }
        Ok(UpsertOutcome::Written)
    }

    async fn find_by_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Option<ClientProfile>, RepositoryError> {
        let statement =
            format!("SELECT {PROFILE_COLUMNS} FROM client_profile WHERE company_id = ?");
        let row =
            sqlx::query(&statement).bind(company_id.as_str()).fetch_optional(&self.pool).await?;

        match row {
            Some(ref row) => Ok(Some(row_to_profile(row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: ProfileFilter) -> Result<Vec<ClientProfile>, RepositoryError> {
        let limit = i64::from(filter.effective_limit());
        let rows = match filter.classification {
            Some(classification) => {
                let statement = format!(
                    "SELECT {PROFILE_COLUMNS} FROM client_profile
                     WHERE classification = ?
                     ORDER BY evaluated_at DESC, company_id ASC
                     LIMIT ?"
                );
                sqlx::query(&statement)
                    .bind(classification.as_str())
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let statement = format!(
                    "SELECT {PROFILE_COLUMNS} FROM client_profile
                     ORDER BY evaluated_at DESC, company_id ASC
                     LIMIT ?"
                );
                sqlx::query(&statement).bind(limit).fetch_all(&self.pool).await?
            }
        };

        rows.iter().map(row_to_profile).collect()
    }

    async fn page(
        &self,
        after: Option<&CompanyId>,
        limit: u32,
    ) -> Result<Vec<ClientProfile>, RepositoryError> {
        let statement = format!(
            "SELECT {PROFILE_COLUMNS} FROM client_profile
             WHERE company_id > ?
             ORDER BY company_id ASC
             LIMIT ?"
        );
        let rows = sqlx::query(&statement)
            .bind(after.map(CompanyId::as_str).unwrap_or(""))
            .bind(i64::from(limit.max(1)))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_profile).collect()
    }
}
