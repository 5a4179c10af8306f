//! Signup, password login and client credential exchange

use crate::api::{JsonBody, SuccessResponse};
use crate::domain::{ClientTokenInput, LoginInput, SignupInput};
use crate::error::Result;
use crate::jwt::{IssuedToken, Subject};
use crate::middleware::gate::TOKEN_COOKIE;
use crate::state::HasServices;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// POST /auth/signup
pub async fn signup<S: HasServices>(
    State(state): State<S>,
    JsonBody(input): JsonBody<SignupInput>,
) -> Result<impl IntoResponse> {
    let user = state.identity_service().signup(input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(user))))
}

/// POST /auth/login
///
/// The token is returned in the body and also set as an http-only cookie.
pub async fn login<S: HasServices>(
    State(state): State<S>,
    jar: CookieJar,
    JsonBody(input): JsonBody<LoginInput>,
) -> Result<impl IntoResponse> {
    let user = state.identity_service().authenticate(&input).await?;
    let issued = state.jwt_manager().issue(&Subject::User {
        id: user.id,
        email: user.email,
    })?;

    let jar = jar.add(token_cookie(&issued));
    Ok((jar, Json(issued)))
}

/// POST /auth/client/token
pub async fn client_token<S: HasServices>(
    State(state): State<S>,
    JsonBody(input): JsonBody<ClientTokenInput>,
) -> Result<Json<IssuedToken>> {
    let client = state
        .application_service()
        .authenticate_client(&input)
        .await?;
    tracing::info!(app_key = %input.app_key, client_id = %client.client_id, "Client authenticated");
    let issued = state.jwt_manager().issue(&Subject::Client {
        client_id: client.client_id,
        app_key: input.app_key,
    })?;
    Ok(Json(issued))
}

fn token_cookie(issued: &IssuedToken) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, issued.token.clone()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}
