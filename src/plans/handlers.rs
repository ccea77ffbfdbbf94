use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{auth::AuthProfessional, error::ApiError, state::AppState};

use super::dto::{DietPlan, PlanRequestBody};
use super::repo;
use super::validation::validate_plan;

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/patients/:patient_id/diet-plans", get(list_plans))
        .route("/diet-plans/:id", get(get_plan))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/patients/:patient_id/diet-plans", post(create_plan))
        .route("/diet-plans/:id", put(update_plan).delete(delete_plan))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_plans(
    State(state): State<AppState>,
    AuthProfessional(professional_id): AuthProfessional,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Vec<DietPlan>>, ApiError> {
    let plans = repo::list_by_patient(&state.db, patient_id, professional_id).await?;
    Ok(Json(plans))
}

#[instrument(skip(state))]
pub async fn get_plan(
    State(state): State<AppState>,
    AuthProfessional(professional_id): AuthProfessional,
    Path(id): Path<Uuid>,
) -> Result<Json<DietPlan>, ApiError> {
    let plan = repo::get_plan(&state.db, id).await?.ok_or(ApiError::NotFound)?;
    if plan.professional_id != professional_id {
        warn!(%id, %professional_id, "plan read by another professional");
        return Err(ApiError::Forbidden);
    }
    Ok(Json(plan))
}

/// POST /patients/:patient_id/diet-plans
#[instrument(skip(state, body))]
pub async fn create_plan(
    State(state): State<AppState>,
    AuthProfessional(professional_id): AuthProfessional,
    Path(patient_id): Path<Uuid>,
    body: Result<Json<PlanRequestBody>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<DietPlan>), ApiError> {
    let Json(body) = body?;
    let valid = validate_plan(&body.draft)?;
    let plan = repo::insert_plan(&state.db, patient_id, professional_id, &valid).await?;
    info!(plan_id = %plan.id, meals = plan.meals.len(), "plan created");

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/diet-plans/{}", plan.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(plan)))
}

/// PUT /diet-plans/:id
///
/// Meals carrying an `id` are updated, the rest created; stored meals left
/// out of the body are deleted. `expectedVersion` turns a stale write into 409.
#[instrument(skip(state, body))]
pub async fn update_plan(
    State(state): State<AppState>,
    AuthProfessional(professional_id): AuthProfessional,
    Path(id): Path<Uuid>,
    body: Result<Json<PlanRequestBody>, JsonRejection>,
) -> Result<Json<DietPlan>, ApiError> {
    let Json(body) = body?;
    let valid = validate_plan(&body.draft)?;
    let plan =
        repo::update_plan(&state.db, id, professional_id, &valid, body.expected_version).await?;
    info!(plan_id = %plan.id, version = plan.version, "plan updated");
    Ok(Json(plan))
}

#[instrument(skip(state))]
pub async fn delete_plan(
    State(state): State<AppState>,
    AuthProfessional(professional_id): AuthProfessional,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    repo::delete_plan(&state.db, id, professional_id).await?;
    info!(plan_id = %id, "plan deleted");
    Ok(StatusCode::NO_CONTENT)
}
