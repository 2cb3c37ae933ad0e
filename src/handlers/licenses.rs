//! Brand-facing endpoints. `BrandCaller` turns away anonymous callers
//! before the body is read.

use axum::{extract::State, http::StatusCode};

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::{BrandCaller, Json, Query};
use crate::models::Caller;
use crate::service::{
    self, ByEmailQuery, ByEmailResponse, LifecycleRequest, LifecycleResponse, ProvisionRequest,
    ProvisionResponse,
};

/// POST /api/v1/licenses/provision/
pub async fn provision(
    State(state): State<AppState>,
    brand: BrandCaller,
    Json(req): Json<ProvisionRequest>,
) -> Result<(StatusCode, Json<ProvisionResponse>)> {
    let mut conn = state.db.get()?;
    let response = service::provision(&mut conn, &Caller::from(brand), &req)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/licenses/lifecycle/
pub async fn lifecycle(
    State(state): State<AppState>,
    brand: BrandCaller,
    Json(req): Json<LifecycleRequest>,
) -> Result<Json<LifecycleResponse>> {
    let mut conn = state.db.get()?;
    Ok(Json(service::apply_lifecycle(&mut conn, &Caller::from(brand), &req)?))
}

/// GET /api/v1/internal/licenses/by-email/?email=
pub async fn by_email(
    State(state): State<AppState>,
    brand: BrandCaller,
    Query(query): Query<ByEmailQuery>,
) -> Result<Json<ByEmailResponse>> {
    let mut conn = state.db.get()?;
    Ok(Json(service::list_by_email(&mut conn, &Caller::from(brand), &query)?))
}
