//! Application and client domain models

use super::common::StringUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A tenant owned by exactly one user. `app_key` is the public identifier.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: StringUuid,
    pub app_key: String,
    pub owner_id: StringUuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Default for Application {
    fn default() -> Self {
        Self {
            id: StringUuid::new_v4(),
            app_key: String::new(),
            owner_id: StringUuid::new_v4(),
            name: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// A credentialed consumer of one application.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: StringUuid,
    pub application_id: StringUuid,
    /// Unique only within the owning application
    pub client_id: String,
    #[serde(skip_serializing, default)]
    pub secret_hash: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Default for Client {
    fn default() -> Self {
        Self {
            id: StringUuid::new_v4(),
            application_id: StringUuid::new_v4(),
            client_id: String::new(),
            secret_hash: String::new(),
            name: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateApplicationInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct CreateClientInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
}

/// Client credential exchange request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientTokenInput {
    pub app_key: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Application with its clients, as returned to owners and client tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationWithClients {
    #[serde(flatten)]
    pub application: Application,
    pub clients: Vec<Client>,
}

/// Newly created client; the plaintext secret is only ever returned here
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientWithSecret {
    #[serde(flatten)]
    pub client: Client,
    pub client_secret: String,
}
