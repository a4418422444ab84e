//! Both profile stores must agree on write ordering, filtering, and paging.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

use clientpulse_core::{
    Classification, ClientProfile, ClvRuntime, CompanyId, DeterministicClvRuntime,
    RawClientMetrics,
};
use clientpulse_db::{
    connect_with_settings, migrations, ClientProfileRepository, InMemoryClientProfileRepository,
    ProfileFilter, SqlClientProfileRepository, UpsertOutcome,
};

fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).single().expect("valid timestamp")
        + Duration::minutes(minutes)
}

fn profile(
    company: &str,
    metrics: serde_json::Value,
    evaluated_at: DateTime<Utc>,
) -> ClientProfile {
    let mut raw: RawClientMetrics = serde_json::from_value(metrics).expect("metrics fixture");
    raw.company_id = CompanyId(company.to_string());
    let (metrics, evaluation) = DeterministicClvRuntime::default().evaluate_raw(&raw);
    evaluation.into_profile(metrics, evaluated_at)
}

async fn exercise_contract(repository: &dyn ClientProfileRepository) {
    let upsell = json!({
        "totalRevenue": 750000, "supportTicketCount": 0, "clientHealthScore": 95,
        "daysSinceFollowUp": 3, "progress": "excellent", "delivered": "TRUE"
    });
    let dormant = json!({ "totalRevenue": "120000.50", "daysSinceFollowUp": 400 });
    let at_risk = json!({ "supportTicketCount": 9, "progress": "Poor" });

    assert_eq!(
        repository.upsert(profile("acme", upsell.clone(), at(0))).await.expect("acme"),
        UpsertOutcome::Written
    );
    repository.upsert(profile("bluth", dormant, at(1))).await.expect("bluth");
    repository.upsert(profile("cyberdyne", at_risk.clone(), at(2))).await.expect("cyberdyne");

    // An older evaluation arriving late must not clobber the stored one.
    assert_eq!(
        repository.upsert(profile("cyberdyne", upsell, at(1))).await.expect("late write"),
        UpsertOutcome::StaleIgnored
    );
    let cyberdyne = repository
        .find_by_company(&CompanyId("cyberdyne".to_string()))
        .await
        .expect("find")
        .expect("stored");
    assert_eq!(cyberdyne.classification.classification, Classification::AtRisk);
    assert_eq!(cyberdyne.pricing.confidence_score, 50);

    let bluth = repository
        .find_by_company(&CompanyId("bluth".to_string()))
        .await
        .expect("find")
        .expect("stored");
    assert_eq!(bluth.classification.classification, Classification::Dormant);
    assert_eq!(bluth.metrics.total_revenue.to_string(), "120000.5");

    let newest_first = repository.list(ProfileFilter::default()).await.expect("list");
    let ids: Vec<&str> = newest_first.iter().map(|profile| profile.company_id.as_str()).collect();
    assert_eq!(ids, vec!["cyberdyne", "bluth", "acme"]);

    let upsell_only = repository
        .list(ProfileFilter { classification: Some(Classification::Upsell), limit: 0 })
        .await
        .expect("filtered");
    assert_eq!(upsell_only.len(), 1, "a zero limit is clamped to one row");
    assert!(upsell_only[0].metrics.delivered);

    let first = repository.page(None, 2).await.expect("first page");
    let second = repository.page(Some(&first[1].company_id), 2).await.expect("second page");
    let paged: Vec<&str> =
        first.iter().chain(second.iter()).map(|profile| profile.company_id.as_str()).collect();
    assert_eq!(paged, vec!["acme", "bluth", "cyberdyne"]);

    // Same instant: the incoming evaluation wins.
    assert_eq!(
        repository.upsert(profile("cyberdyne", at_risk.clone(), at(2))).await.expect("tie"),
        UpsertOutcome::Written
    );

    // Nanoseconds below stored precision do not make a write stale.
    let within_micro = at(3) + Duration::nanoseconds(900);
    repository.upsert(profile("cyberdyne", at_risk.clone(), within_micro)).await.expect("later");
    assert_eq!(
        repository
            .upsert(profile("cyberdyne", at_risk, at(3) + Duration::nanoseconds(100)))
            .await
            .expect("same micro"),
        UpsertOutcome::Written
    );
    let cyberdyne = repository
        .find_by_company(&CompanyId("cyberdyne".to_string()))
        .await
        .expect("find")
        .expect("stored");
    assert_eq!(cyberdyne.evaluated_at, at(3));
    assert_eq!(cyberdyne.follow_up_anchor_at, at(3));
}

#[tokio::test]
async fn sqlite_store_honors_profile_contract() {
    let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");

    exercise_contract(&SqlClientProfileRepository::new(pool.clone())).await;

    pool.close().await;
}

#[tokio::test]
async fn in_memory_store_honors_profile_contract() {
    exercise_contract(&InMemoryClientProfileRepository::default()).await;
}
