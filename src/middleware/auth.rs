//! Resolved identity attached to requests that passed the gate

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::domain::StringUuid;
use crate::error::{AppError, Result};
use crate::jwt::{Subject, SubjectType};
use crate::policy::AccessScope;

/// Inserted into request extensions by the gate on every allowed request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// `None` only when enforcement is disabled and no token was sent
    pub subject: Option<Subject>,
    pub scope: AccessScope,
    /// Application the request targets, if any
    pub app_key: Option<String>,
}

/// Identity forwarded to upstream services by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityContext {
    pub subject_type: Option<SubjectType>,
    pub subject_id: Option<String>,
    pub application: Option<String>,
    pub scope: AccessScope,
}

impl AuthContext {
    pub fn anonymous(app_key: Option<String>) -> Self {
        Self {
            subject: None,
            scope: AccessScope::Open,
            app_key,
        }
    }

    /// Id of the calling user. Anonymous callers get 401, client tokens 403.
    pub fn require_user(&self) -> Result<StringUuid> {
        match &self.subject {
            Some(Subject::User { id, .. }) => Ok(*id),
            Some(Subject::Client { .. }) => Err(AppError::Forbidden(
                "Client tokens cannot perform this action".to_string(),
            )),
            None => Err(AppError::Unauthorized("Authentication required".to_string())),
        }
    }

    pub fn identity(&self) -> IdentityContext {
        IdentityContext {
            subject_type: self.subject.as_ref().map(Subject::subject_type),
            subject_id: self.subject.as_ref().map(Subject::subject_id),
            application: self.app_key.clone(),
            scope: self.scope,
        }
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}
