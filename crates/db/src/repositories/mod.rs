use async_trait::async_trait;
use thiserror::Error;

use clientpulse_core::domain::classification::Classification;
use clientpulse_core::domain::client::CompanyId;
use clientpulse_core::domain::profile::ClientProfile;

pub mod client_profile;
pub mod memory;

pub use client_profile::SqlClientProfileRepository;
pub use memory::InMemoryClientProfileRepository;

pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 500;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Written,
    /// A profile evaluated later than this one is already stored.
    StaleIgnored,
}

impl UpsertOutcome {
    pub fn written(self) -> bool {
        matches!(self, Self::Written)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProfileFilter {
    pub classification: Option<Classification>,
    pub limit: u32,
}

impl Default for ProfileFilter {
    fn default() -> Self {
        Self { classification: None, limit: DEFAULT_LIST_LIMIT }
    }
}

impl ProfileFilter {
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_LIST_LIMIT)
    }
}

#[async_trait]
pub trait ClientProfileRepository: Send + Sync {
    /// Last writer wins by `evaluated_at`; ties go to the incoming profile.
    async fn upsert(&self, profile: ClientProfile) -> Result<UpsertOutcome, RepositoryError>;

    async fn find_by_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Option<ClientProfile>, RepositoryError>;

    /// Most recently evaluated first.
    async fn list(&self, filter: ProfileFilter) -> Result<Vec<ClientProfile>, RepositoryError>;

    /// Keyset page ordered by company id, starting after `after`.
    async fn page(
        &self,
        after: Option<&CompanyId>,
        limit: u32,
    ) -> Result<Vec<ClientProfile>, RepositoryError>;
}
