pub mod licenses;
pub mod public;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::db::AppState;
use crate::middleware::brand_auth;

/// Build the full application router.
///
/// Every `/api` route runs behind `brand_auth`, so an unknown `X-API-Key` is
/// rejected even where no brand is required.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // End-user software (no brand identity)
        .route("/api/v1/licenses/activate/", post(public::activate))
        .route("/api/v1/licenses/deactivate/", post(public::deactivate))
        .route("/api/v1/licenses/check/", get(public::check))
        // Brand integrations (X-API-Key required)
        .route("/api/v1/licenses/provision/", post(licenses::provision))
        .route("/api/v1/licenses/lifecycle/", post(licenses::lifecycle))
        .route("/api/v1/internal/licenses/by-email/", get(licenses::by_email))
        .layer(middleware::from_fn_with_state(state.clone(), brand_auth));

    Router::new()
        .route("/health", get(public::health))
        .merge(api)
        .with_state(state)
}
