use std::collections::BTreeMap;

use tokio::sync::RwLock;

use clientpulse_core::domain::client::CompanyId;
use clientpulse_core::domain::profile::ClientProfile;

use super::{ClientProfileRepository, ProfileFilter, RepositoryError, UpsertOutcome};

#[derive(Default)]
pub struct InMemoryClientProfileRepository {
    profiles: RwLock<BTreeMap<String, ClientProfile>>,
}

#[async_trait::async_trait]
impl ClientProfileRepository for InMemoryClientProfileRepository {
    async fn upsert(&self, profile: ClientProfile) -> Result<UpsertOutcome, RepositoryError> {
        let mut profiles = self.profiles.write().await;
        if let Some(existing) = profiles.get(profile.company_id.as_str()) {
            if !profile.is_newer_than(existing) {
                return Ok(UpsertOutcome::StaleIgnored);
            }
        }
        profiles.insert(profile.company_id.0.clone(), profile);
        Ok(UpsertOutcome::Written)
    }

    async fn find_by_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Option<ClientProfile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(company_id.as_str()).cloned())
    }

    async fn list(&self, filter: ProfileFilter) -> Result<Vec<ClientProfile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        let mut matching: Vec<ClientProfile> = profiles
            .values()
            .filter(|profile| {
                filter
                    .classification
                    .map_or(true, |wanted| profile.classification.classification == wanted)
            })
            .cloned()
            .collect();

        matching.sort_by(|left, right| {
            right
                .evaluated_at
                .cmp(&left.evaluated_at)
                .then_with(|| left.company_id.cmp(&right.company_id))
        });
        matching.truncate(filter.effective_limit() as usize);
        Ok(matching)
    }

    async fn page(
        &self,
        after: Option<&CompanyId>,
        limit: u32,
    ) -> Result<Vec<ClientProfile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        let floor = after.map(CompanyId::as_str).unwrap_or("");
        Ok(profiles
            .iter()
            .filter(|(company_id, _)| company_id.as_str() > floor)
            .take(limit.max(1) as usize)
            .map(|(_, profile)| profile.clone())
            .collect())
    }
}
