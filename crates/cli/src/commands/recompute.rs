use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use clientpulse_core::{
    ClientProfile, ClvRuntime, CompanyId, DeterministicClvRuntime, RawClientMetrics,
};
use clientpulse_db::{
    connect_with_settings, ClientProfileRepository, RepositoryError, SqlClientProfileRepository,
    UpsertOutcome,
};

use crate::commands::{build_runtime, load_config, CommandResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RecomputeSummary {
    pub evaluated: u64,
    pub written: u64,
    pub stale_ignored: u64,
    pub reclassified: u64,
}

pub fn run() -> CommandResult {
    let config = match load_config("recompute") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("recompute") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let repository = SqlClientProfileRepository::new(pool.clone());
        let summary = recompute_all(
            &repository,
            &DeterministicClvRuntime::default(),
            config.clv.recompute_batch_size,
            Utc::now(),
        )
        .await
        .map_err(|error| ("recompute", error.to_string(), 6u8));

        pool.close().await;
        summary
    });

    match result {
        Ok(summary) => CommandResult::success_with_data(
            "recompute",
            format!(
                "re-evaluated {} profile(s): {} written, {} stale ignored, {} reclassified",
                summary.evaluated, summary.written, summary.stale_ignored, summary.reclassified
            ),
            serde_json::to_value(summary).ok(),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("recompute", error_class, message, exit_code)
        }
    }
}

/// Walks every stored profile in company-id order, `batch_size` at a time,
/// and writes a fresh evaluation for each.
pub async fn recompute_all<R, E>(
    repository: &R,
    engine: &E,
    batch_size: u32,
    now: DateTime<Utc>,
) -> Result<RecomputeSummary, RepositoryError>
where
    R: ClientProfileRepository + ?Sized,
    E: ClvRuntime,
{
    let mut summary = RecomputeSummary::default();
    let mut cursor: Option<CompanyId> = None;

    loop {
        let batch = repository.page(cursor.as_ref(), batch_size).await?;
        let Some(last) = batch.last() else {
            break;
        };
        cursor = Some(last.company_id.clone());

        for stored in batch {
            let (metrics, evaluation) = engine.evaluate_raw(&aged_metrics(&stored, now));
            if evaluation.classification.classification != stored.classification.classification {
                summary.reclassified += 1;
            }
            summary.evaluated += 1;

            let mut refreshed = evaluation.into_profile(metrics, now);
            refreshed.follow_up_anchor_at = stored.follow_up_anchor_at;

            match repository.upsert(refreshed).await? {
                UpsertOutcome::Written => summary.written += 1,
                UpsertOutcome::StaleIgnored => summary.stale_ignored += 1,
            }
        }
    }

    Ok(summary)
}

/// Stored metrics with the follow-up age measured from the profile's anchor,
/// so partial days carry over between runs.
fn aged_metrics(profile: &ClientProfile, now: DateTime<Utc>) -> RawClientMetrics {
    let mut raw = RawClientMetrics::from(&profile.metrics);
    raw.days_since_follow_up = Value::from(profile.follow_up_age_at(now));
    raw
}
