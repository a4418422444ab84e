pub mod clv;
pub mod config;
pub mod domain;
pub mod errors;

pub use clv::aggregate::{
    assemble, days_since_follow_up, ClientActivity, DealRecord, ReviewRecord, SupportTicketRecord,
};
pub use clv::classifier::{classify, value_category, ClientClassifier, DeterministicClientClassifier};
pub use clv::normalize::normalize;
pub use clv::pricing::{recommend_pricing, DeterministicPricingAdvisor, PricingAdvisor};
pub use clv::{ClvEvaluation, ClvRuntime, DeterministicClvRuntime};
pub use domain::classification::{Classification, ClassificationResult, ValueCategory};
pub use domain::client::{ClientMetrics, CompanyId, Progress, RawClientMetrics};
pub use domain::pricing::{DiscountBreakdown, PricingInput, PricingRecommendation};
pub use domain::profile::ClientProfile;
pub use errors::{ApplicationError, DomainError, InterfaceError};
