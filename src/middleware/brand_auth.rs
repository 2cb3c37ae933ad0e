use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::models::Caller;

/// Header carrying a brand's API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Resolve the `X-API-Key` header into a `Caller` request extension.
///
/// A missing or blank header means an anonymous caller. A header that is not
/// valid UTF-8 or names no brand is rejected with 401 before the handler
/// runs, whether or not the route needs a brand.
pub async fn brand_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let api_key = match request.headers().get(API_KEY_HEADER) {
        None => None,
        Some(value) => {
            let key = value.to_str().map_err(|_| AppError::Unauthorized)?.trim();
            (!key.is_empty()).then(|| key.to_string())
        }
    };

    let caller = match api_key {
        None => Caller::Anonymous,
        Some(api_key) => {
            let conn = state.db.get()?;
            let brand = queries::get_brand_by_api_key(&conn, &api_key)?.ok_or_else(|| {
                tracing::debug!("Rejected unknown brand API key");
                AppError::Unauthorized
            })?;
            Caller::Brand(brand)
        }
    };

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
