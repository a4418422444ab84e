use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use clientpulse_core::clv::aggregate::DEFAULT_MISSING_FOLLOW_UP_DAYS;
use clientpulse_core::{
    assemble, ApplicationError, Classification, ClientActivity, ClientMetrics, ClientProfile,
    ClvEvaluation, ClvRuntime, CompanyId, DeterministicClvRuntime, DomainError, InterfaceError,
    PricingRecommendation, RawClientMetrics,
};
use clientpulse_db::{ClientProfileRepository, ProfileFilter, RepositoryError, UpsertOutcome};

#[derive(Clone)]
pub struct ClvState {
    runtime: Arc<dyn ClvRuntime>,
    repository: Arc<dyn ClientProfileRepository>,
    missing_follow_up_days: i64,
}

impl ClvState {
    pub fn new(runtime: Arc<dyn ClvRuntime>, repository: Arc<dyn ClientProfileRepository>) -> Self {
        Self { runtime, repository, missing_follow_up_days: DEFAULT_MISSING_FOLLOW_UP_DAYS }
    }

    pub fn deterministic(repository: Arc<dyn ClientProfileRepository>) -> Self {
        Self::new(Arc::new(DeterministicClvRuntime::default()), repository)
    }

    /// Follow-up age assumed for companies whose activity has no follow-up.
    pub fn with_missing_follow_up_days(mut self, days: i64) -> Self {
        self.missing_follow_up_days = days;
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    pub metrics: ClientMetrics,
    #[serde(flatten)]
    pub evaluation: ClvEvaluation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileWriteResponse {
    pub profile: ClientProfile,
    /// False when a newer evaluation was already stored; `profile` is then that one.
    pub written: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileListResponse {
    pub profiles: Vec<ClientProfile>,
    pub count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileListQuery {
    pub classification: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: &'static str,
    correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    fn bad_request(message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: correlation_id.to_string(),
        })
    }

    fn from_application(
        error: ApplicationError,
        correlation_id: &str,
        event_name: &'static str,
    ) -> Self {
        let interface = error.into_interface(correlation_id);
        warn!(
            event_name = event_name,
            correlation_id = %correlation_id,
            error = %interface,
            "request rejected"
        );
        Self(interface)
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.0.to_string(),
            message: self.0.user_message(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: ClvState) -> Router {
    Router::new()
        .route("/api/v1/clv/evaluate", post(evaluate))
        .route("/api/v1/clv/assemble", post(assemble_and_evaluate))
        .route("/api/v1/clv/pricing", post(pricing))
        .route("/api/v1/clients/profiles", get(list_profiles))
        .route("/api/v1/clients/{company_id}/profile", get(get_profile).put(put_profile))
        .with_state(state)
}

fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

fn read_body<T>(
    payload: Result<Json<T>, JsonRejection>,
    correlation_id: &str,
) -> Result<T, ApiError> {
    payload.map(|Json(raw)| raw).map_err(|rejection| {
        warn!(
            event_name = "clv.request.invalid_body",
            correlation_id = %correlation_id,
            error = %rejection.body_text(),
            "request body rejected"
        );
        ApiError::bad_request(rejection.body_text(), correlation_id)
    })
}

fn require_company(
    company_id: &CompanyId,
    correlation_id: &str,
    event_name: &'static str,
) -> Result<(), ApiError> {
    if company_id.is_blank() {
        return Err(ApiError::from_application(
            DomainError::MissingCompanyId.into(),
            correlation_id,
            event_name,
        ));
    }
    Ok(())
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

pub async fn evaluate(
    State(state): State<ClvState>,
    payload: Result<Json<RawClientMetrics>, JsonRejection>,
) -> Result<Json<EvaluationResponse>, ApiError> {
    let correlation_id = new_correlation_id();
    let raw = read_body(payload, &correlation_id)?;
    require_company(&raw.company_id, &correlation_id, "clv.evaluate.rejected")?;

    let (metrics, evaluation) = state.runtime.evaluate_raw(&raw);
    info!(
        event_name = "clv.evaluate.completed",
        correlation_id = %correlation_id,
        company_id = %metrics.company_id,
        classification = %evaluation.classification.classification,
        "client evaluated"
    );

    Ok(Json(EvaluationResponse { metrics, evaluation }))
}

pub async fn assemble_and_evaluate(
    State(state): State<ClvState>,
    payload: Result<Json<ClientActivity>, JsonRejection>,
) -> Result<Json<EvaluationResponse>, ApiError> {
    let correlation_id = new_correlation_id();
    let activity = read_body(payload, &correlation_id)?;

    let raw = assemble(&activity, Utc::now(), state.missing_follow_up_days).map_err(|error| {
        ApiError::from_application(error.into(), &correlation_id, "clv.assemble.rejected")
    })?;
    let (metrics, evaluation) = state.runtime.evaluate_raw(&raw);
    info!(
        event_name = "clv.assemble.completed",
        correlation_id = %correlation_id,
        company_id = %metrics.company_id,
        deals = activity.deals.len(),
        classification = %evaluation.classification.classification,
        "client activity evaluated"
    );

    Ok(Json(EvaluationResponse { metrics, evaluation }))
}

pub async fn pricing(
    State(state): State<ClvState>,
    payload: Result<Json<RawClientMetrics>, JsonRejection>,
) -> Result<Json<PricingRecommendation>, ApiError> {
    let correlation_id = new_correlation_id();
    let raw = read_body(payload, &correlation_id)?;

    let (_, evaluation) = state.runtime.evaluate_raw(&raw);
    info!(
        event_name = "clv.pricing.completed",
        correlation_id = %correlation_id,
        recommended_discount = evaluation.pricing.recommended_discount,
        "pricing recommended"
    );

    Ok(Json(evaluation.pricing))
}

pub async fn put_profile(
    State(state): State<ClvState>,
    Path(company_id): Path<String>,
    payload: Result<Json<RawClientMetrics>, JsonRejection>,
) -> Result<Json<ProfileWriteResponse>, ApiError> {
    const EVENT: &str = "clv.profile.upsert_failed";
    let correlation_id = new_correlation_id();
    let mut raw = read_body(payload, &correlation_id)?;
    raw.company_id = CompanyId(company_id);
    require_company(&raw.company_id, &correlation_id, EVENT)?;

    let (metrics, evaluation) = state.runtime.evaluate_raw(&raw);
    let profile = evaluation.into_profile(metrics, Utc::now());
    let outcome = state
        .repository
        .upsert(profile.clone())
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &correlation_id, EVENT))?;

    let stored = match outcome {
        UpsertOutcome::Written => profile,
        UpsertOutcome::StaleIgnored => state
            .repository
            .find_by_company(&profile.company_id)
            .await
            .map_err(|error| {
                ApiError::from_application(persistence(error), &correlation_id, EVENT)
            })?
            .ok_or_else(|| {
                ApiError::from_application(
                    ApplicationError::ProfileNotFound(profile.company_id.to_string()),
                    &correlation_id,
                    EVENT,
                )
            })?,
    };

    info!(
        event_name = "clv.profile.upserted",
        correlation_id = %correlation_id,
        company_id = %stored.company_id,
        classification = %stored.classification.classification,
        written = outcome.written(),
        "client profile upserted"
    );

    Ok(Json(ProfileWriteResponse { profile: stored, written: outcome.written() }))
}

pub async fn get_profile(
    State(state): State<ClvState>,
    Path(company_id): Path<String>,
) -> Result<Json<ClientProfile>, ApiError> {
    const EVENT: &str = "clv.profile.lookup_failed";
    let correlation_id = new_correlation_id();
    let company_id = CompanyId(company_id);

    state
        .repository
        .find_by_company(&company_id)
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &correlation_id, EVENT))?
        .map(Json)
        .ok_or_else(|| {
            ApiError::from_application(
                ApplicationError::ProfileNotFound(company_id.to_string()),
                &correlation_id,
                EVENT,
            )
        })
}

pub async fn list_profiles(
    State(state): State<ClvState>,
    query: Result<Query<ProfileListQuery>, QueryRejection>,
) -> Result<Json<ProfileListResponse>, ApiError> {
    const EVENT: &str = "clv.profile.list_failed";
    let correlation_id = new_correlation_id();
    let Query(query) =
        query.map_err(|rejection| ApiError::bad_request(rejection.body_text(), &correlation_id))?;

    let classification = query
        .classification
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .map(Classification::from_str)
        .transpose()
        .map_err(|error| ApiError::from_application(error.into(), &correlation_id, EVENT))?;

    let mut filter = ProfileFilter { classification, ..ProfileFilter::default() };
    if let Some(limit) = query.limit {
        filter.limit = limit;
    }

    let profiles = state
        .repository
        .list(filter)
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &correlation_id, EVENT))?;

    Ok(Json(ProfileListResponse { count: profiles.len(), profiles }))
}
