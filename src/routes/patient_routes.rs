// src/routes/patient_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::session::SessionContext,
    models::{ApiOk, AppState, Patient},
};

const SEARCH_LIMIT: i64 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients", get(search_patients))
        .route("/patients/me", get(get_me))
        .route("/patients/{patient_id}", get(get_patient))
}

fn ensure_self_or_staff(auth: &SessionContext, patient_id: Uuid) -> Result<(), ApiError> {
    if auth.session().is_staff() || auth.user_id == patient_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Patients can only view their own record".into(),
        ))
    }
}

async fn load_patient(state: &AppState, patient_id: Uuid) -> Result<Patient, ApiError> {
    state
        .queue
        .store()
        .get_patient(patient_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "patient not found".into()))
}

pub async fn get_me(
    State(state): State<AppState>,
    auth: SessionContext,
) -> Result<Json<ApiOk<Patient>>, ApiError> {
    let patient = load_patient(&state, auth.user_id).await?;
    Ok(Json(ApiOk { data: patient }))
}

pub async fn get_patient(
    State(state): State<AppState>,
    auth: SessionContext,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<ApiOk<Patient>>, ApiError> {
    ensure_self_or_staff(&auth, patient_id)?;

    let patient = load_patient(&state, patient_id).await?;
    Ok(Json(ApiOk { data: patient }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

/// Staff lookup by name, used when booking on a patient's behalf.
pub async fn search_patients(
    State(state): State<AppState>,
    auth: SessionContext,
    Query(q): Query<SearchQuery>,
) -> Result<Json<ApiOk<Vec<Patient>>>, ApiError> {
    if !auth.session().is_staff() {
        return Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only staff can search patients".into(),
        ));
    }

    let rows = state
        .queue
        .store()
        .search_patients(q.query.as_deref(), SEARCH_LIMIT)
        .await?;

    Ok(Json(ApiOk { data: rows }))
}
