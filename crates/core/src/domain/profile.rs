use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::classification::ClassificationResult;
use crate::domain::client::{ClientMetrics, CompanyId};
use crate::domain::pricing::PricingRecommendation;

/// Stored timestamps carry microseconds; anything finer is dropped.
pub const TIMESTAMP_SUBSEC_DIGITS: u16 = 6;

/// Immutable snapshot of one evaluation, ready for a single upsert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    pub company_id: CompanyId,
    pub metrics: ClientMetrics,
    pub classification: ClassificationResult,
    pub pricing: PricingRecommendation,
    pub evaluated_at: DateTime<Utc>,
    /// Instant the follow-up age counts from. Unlike `evaluated_at` it stays
    /// put across recomputes.
    pub follow_up_anchor_at: DateTime<Utc>,
}

impl ClientProfile {
    pub fn is_newer_than(&self, other: &ClientProfile) -> bool {
        self.evaluated_at.trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS)
            >= other.evaluated_at.trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS)
    }

    /// Whole days between the follow-up anchor and `now`, never less than the
    /// age already recorded.
    pub fn follow_up_age_at(&self, now: DateTime<Utc>) -> i64 {
        let recorded = i64::from(self.metrics.days_since_follow_up);
        (now - self.follow_up_anchor_at).num_days().max(recorded)
    }
}

/// `evaluated_at` minus the reported follow-up age, floored at the Unix epoch.
/// Ages reaching past the floor stay covered by the recorded day count.
pub fn follow_up_anchor(evaluated_at: DateTime<Utc>, days_since_follow_up: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(days_since_follow_up))
        .and_then(|age| evaluated_at.checked_sub_signed(age))
        .map_or(DateTime::<Utc>::UNIX_EPOCH, |anchor| anchor.max(DateTime::<Utc>::UNIX_EPOCH))
}
