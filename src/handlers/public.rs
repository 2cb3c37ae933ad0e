//! Endpoints called by end-user software instances. No brand identity needed.

use axum::extract::State;
use serde::Serialize;

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::{Json, Query};
use crate::service::{
    self, ActivateRequest, ActivateResponse, CheckQuery, CheckResponse, DeactivateRequest,
    DeactivateResponse,
};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /api/v1/licenses/activate/
pub async fn activate(
    State(state): State<AppState>,
    Json(req): Json<ActivateRequest>,
) -> Result<Json<ActivateResponse>> {
    let mut conn = state.db.get()?;
    Ok(Json(service::activate(&mut conn, &req)?))
}

/// POST /api/v1/licenses/deactivate/
pub async fn deactivate(
    State(state): State<AppState>,
    Json(req): Json<DeactivateRequest>,
) -> Result<Json<DeactivateResponse>> {
    let mut conn = state.db.get()?;
    Ok(Json(service::deactivate(&mut conn, &req)?))
}

/// GET /api/v1/licenses/check/?license_key=
pub async fn check(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<CheckResponse>> {
    let mut conn = state.db.get()?;
    Ok(Json(service::check_license_key(&mut conn, &query)?))
}
