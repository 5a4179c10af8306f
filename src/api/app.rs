//! Application and client endpoints
//!
//! The gate has already authorized the caller for the application in the path;
//! handlers only enforce the subject kind an operation needs.

use crate::api::{JsonBody, SuccessResponse};
use crate::domain::{CreateApplicationInput, CreateClientInput};
use crate::error::{AppError, Result};
use crate::middleware::AuthContext;
use crate::state::HasServices;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

/// GET /api/app
pub async fn list<S: HasServices>(
    State(state): State<S>,
    ctx: AuthContext,
) -> Result<impl IntoResponse> {
    let owner_id = ctx.require_user()?;
    let applications = state.application_service().list_for_owner(owner_id).await?;
    Ok(Json(SuccessResponse::new(applications)))
}

/// PUT /api/app
pub async fn create<S: HasServices>(
    State(state): State<S>,
    ctx: AuthContext,
    JsonBody(input): JsonBody<CreateApplicationInput>,
) -> Result<impl IntoResponse> {
    let owner_id = ctx.require_user()?;

    // A token can outlive its user.
    let owner = match state.identity_service().get(owner_id).await {
        Ok(user) => user,
        Err(AppError::NotFound(_)) => {
            return Err(AppError::Unauthorized("Unknown user".to_string()))
        }
        Err(e) => return Err(e),
    };

    let application = state.application_service().create(owner.id, input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(application))))
}

/// GET /api/app/{app_key}
pub async fn get<S: HasServices>(
    State(state): State<S>,
    Path(app_key): Path<String>,
) -> Result<impl IntoResponse> {
    let application = state.application_service().get_with_clients(&app_key).await?;
    Ok(Json(SuccessResponse::new(application)))
}

/// PUT /api/app/{app_key}/client
pub async fn create_client<S: HasServices>(
    State(state): State<S>,
    ctx: AuthContext,
    Path(app_key): Path<String>,
    body: Option<JsonBody<CreateClientInput>>,
) -> Result<impl IntoResponse> {
    ctx.require_user()?;
    let input = body.map(|JsonBody(input)| input).unwrap_or_default();
    let client = state
        .application_service()
        .create_client(&app_key, input)
        .await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(client))))
}

/// GET /api/app/{app_key}/client/{client_id}
pub async fn get_client<S: HasServices>(
    State(state): State<S>,
    Path((app_key, client_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let client = state
        .application_service()
        .get_client(&app_key, &client_id)
        .await?;
    Ok(Json(SuccessResponse::new(client)))
}
