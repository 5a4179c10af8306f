//! Request gate
//!
//! Every protected route passes through here: the token is taken from the
//! `Authorization: Bearer` header or the `authx_token` cookie, verified, and the
//! requested resource is checked against the policy engine. Allowed requests
//! carry an [`AuthContext`] to the handler.
//!
//! A missing token is rejected before any store lookup. A denied request gets the
//! same 404 as a request for an application that does not exist.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use metrics::counter;

use super::auth::AuthContext;
use crate::error::{AppError, Result};
use crate::policy::{self, Decision, DenyReason, PolicyAction, PolicyInput};
use crate::state::HasServices;

/// Cookie consulted when no bearer header is present
pub const TOKEN_COOKIE: &str = "authx_token";

/// Which route table the gate protects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Api,
    Gateway,
}

/// Read the token from the bearer header, falling back to the cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(auth.token().to_string());
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Percent-decode every segment of a request path.
///
/// `None` when a segment is not UTF-8 after decoding, is a `.` or `..` segment in
/// any encoding, or hides a separator. Empty segments are kept.
pub fn decode_segments(path: &str) -> Option<Vec<String>> {
    path.trim_start_matches('/')
        .split('/')
        .map(|raw| {
            let segment = urlencoding::decode(raw).ok()?.into_owned();
            let rejected =
                matches!(segment.as_str(), "." | "..") || segment.contains(['/', '\\']);
            (!rejected).then_some(segment)
        })
        .collect()
}

/// Map a request onto the policy input it needs.
///
/// Segments are decoded first, so the key checked here is the key the handler sees.
pub fn resolve_resource(kind: RouteKind, method: &Method, path: &str) -> Option<PolicyInput> {
    let decoded = decode_segments(path)?;
    let segments: Vec<&str> = decoded
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();

    match kind {
        RouteKind::Gateway => segments
            .first()
            .map(|key| PolicyInput::application(PolicyAction::GatewayForward, *key)),
        RouteKind::Api => match segments.as_slice() {
            ["api", "app"] if *method == Method::PUT => {
                Some(PolicyInput::global(PolicyAction::ApplicationCreate))
            }
            ["api", "app"] => Some(PolicyInput::global(PolicyAction::ApplicationList)),
            ["api", "app", key] => Some(PolicyInput::application(
                PolicyAction::ApplicationRead,
                *key,
            )),
            ["api", "app", key, "client"] => {
                Some(PolicyInput::application(PolicyAction::ClientCreate, *key))
            }
            ["api", "app", key, "client", _] => {
                Some(PolicyInput::application(PolicyAction::ClientRead, *key))
            }
            _ => None,
        },
    }
}

/// Gate for the REST API route group
pub async fn api_gate<S: HasServices>(
    State(state): State<S>,
    request: Request<Body>,
    next: Next,
) -> Response {
    gate(&state, RouteKind::Api, request, next).await
}

/// Gate for forwarded gateway traffic
pub async fn gateway_gate<S: HasServices>(
    State(state): State<S>,
    request: Request<Body>,
    next: Next,
) -> Response {
    gate(&state, RouteKind::Gateway, request, next).await
}

async fn gate<S: HasServices>(
    state: &S,
    kind: RouteKind,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_token(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match evaluate(state, kind, &method, &path, token).await {
        Ok(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Decide one request. Returns the context to attach, or the rejection.
pub async fn evaluate<S: HasServices>(
    state: &S,
    kind: RouteKind,
    method: &Method,
    path: &str,
    token: Option<String>,
) -> Result<AuthContext> {
    let input = resolve_resource(kind, method, path)
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;
    let app_key = input.scope.app_key().map(str::to_string);

    let Some(token) = token else {
        if !state.config().auth.enabled {
            counter!("authx_gate_decisions_total", "outcome" => "open").increment(1);
            return Ok(AuthContext::anonymous(app_key));
        }
        counter!("authx_gate_decisions_total", "outcome" => "unauthenticated").increment(1);
        return Err(AppError::Unauthorized("Authentication required".to_string()));
    };

    let subject = match state.jwt_manager().verify_subject(&token) {
        Ok(subject) => subject,
        Err(e) => {
            counter!("authx_gate_decisions_total", "outcome" => "invalid_token").increment(1);
            return Err(e);
        }
    };

    let application = match &app_key {
        Some(key) => state.application_service().find(key).await?,
        None => None,
    };

    match policy::authorize(Some(&subject), &input, application.as_ref()) {
        Decision::Allow(scope) => {
            counter!("authx_gate_decisions_total", "outcome" => "allow").increment(1);
            tracing::debug!(
                action = input.action.as_str(),
                subject = %subject.subject_id(),
                "Request allowed"
            );
            Ok(AuthContext {
                subject: Some(subject),
                scope,
                app_key,
            })
        }
        Decision::Deny(DenyReason::Unauthenticated) => {
            counter!("authx_gate_decisions_total", "outcome" => "unauthenticated").increment(1);
            Err(AppError::Unauthorized("Authentication required".to_string()))
        }
        Decision::Deny(DenyReason::Unauthorized) => {
            counter!("authx_gate_decisions_total", "outcome" => "deny").increment(1);
            tracing::debug!(
                action = input.action.as_str(),
                subject = %subject.subject_id(),
                "Request denied"
            );
            Err(AppError::NotFound("Not found".to_string()))
        }
    }
}
