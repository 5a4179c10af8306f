//! Gateway mode catch-all handler

use crate::error::{AppError, Result};
use crate::middleware::AuthContext;
use crate::state::HasServices;
use axum::{body::Body, extract::State, http::Request, response::Response};

/// ANY /{app_key} and /{app_key}/{*path}
pub async fn forward<S: HasServices>(
    State(state): State<S>,
    ctx: AuthContext,
    request: Request<Body>,
) -> Result<Response> {
    let app_key = ctx
        .app_key
        .clone()
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;
    state.gateway().forward(&app_key, &ctx, request).await
}
