//! REST API handlers and shared response types

pub mod app;
pub mod auth;
pub mod gateway;
pub mod health;
pub mod metrics;

use crate::error::AppError;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, OptionalFromRequest, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::{Deserialize, Serialize};

/// Success response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// JSON body extractor whose rejections render as `AppError::BadRequest`.
///
/// Plain `Json` answers 415/422 as text; every malformed body here is a 400
/// in the usual error shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match <Json<T> as FromRequest<S>>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "Rejected request body");
                Err(AppError::BadRequest("Invalid request body".to_string()))
            }
        }
    }
}

/// An absent body (no content type) is `None`; a present but malformed one is still a 400.
impl<S, T> OptionalFromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        if !req.headers().contains_key(CONTENT_TYPE) {
            return Ok(None);
        }
        <Self as FromRequest<S>>::from_request(req, state)
            .await
            .map(Some)
    }
}
