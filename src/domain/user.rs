//! User domain model

use super::common::StringUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// User entity. The password hash never leaves the service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: StringUuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: StringUuid::new_v4(),
            email: String::new(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// Body of signup requests
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SignupInput {
    #[validate(email, length(max = 320))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Body of login requests
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}
