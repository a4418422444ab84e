pub mod aggregate;
pub mod classifier;
pub mod normalize;
pub mod pricing;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    classification::ClassificationResult,
    client::{ClientMetrics, RawClientMetrics},
    pricing::{PricingInput, PricingRecommendation},
    profile::{follow_up_anchor, ClientProfile, TIMESTAMP_SUBSEC_DIGITS},
};

use self::{
    classifier::{ClientClassifier, DeterministicClientClassifier},
    pricing::{DeterministicPricingAdvisor, PricingAdvisor},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClvEvaluation {
    pub classification: ClassificationResult,
    pub pricing: PricingRecommendation,
}

impl ClvEvaluation {
    /// Builds the profile for a fresh evaluation. `evaluated_at` is cut to
    /// stored precision so every store compares the same instant.
    pub fn into_profile(self, metrics: ClientMetrics, evaluated_at: DateTime<Utc>) -> ClientProfile {
        let evaluated_at = evaluated_at.trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS);
        ClientProfile {
            company_id: metrics.company_id.clone(),
            follow_up_anchor_at: follow_up_anchor(evaluated_at, metrics.days_since_follow_up),
            metrics,
            classification: self.classification,
            pricing: self.pricing,
            evaluated_at,
        }
    }
}

pub trait ClvRuntime: Send + Sync {
    fn evaluate(&self, metrics: &ClientMetrics) -> ClvEvaluation;

    fn evaluate_raw(&self, raw: &RawClientMetrics) -> (ClientMetrics, ClvEvaluation) {
        let metrics = normalize::normalize(raw);
        let evaluation = self.evaluate(&metrics);
        (metrics, evaluation)
    }
}

pub struct DeterministicClvRuntime<C, P> {
    classifier: C,
    pricing_advisor: P,
}

impl<C, P> DeterministicClvRuntime<C, P> {
    pub fn new(classifier: C, pricing_advisor: P) -> Self {
        Self { classifier, pricing_advisor }
    }
}

impl Default for DeterministicClvRuntime<DeterministicClientClassifier, DeterministicPricingAdvisor> {
    fn default() -> Self {
        Self::new(DeterministicClientClassifier, DeterministicPricingAdvisor)
    }
}

impl<C, P> ClvRuntime for DeterministicClvRuntime<C, P>
where
    C: ClientClassifier,
    P: PricingAdvisor,
{
    fn evaluate(&self, metrics: &ClientMetrics) -> ClvEvaluation {
        let classification = self.classifier.classify(metrics);
        let pricing = self.pricing_advisor.recommend(&PricingInput::from(metrics));

        ClvEvaluation { classification, pricing }
    }
}
