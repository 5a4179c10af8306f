//! Client repository
//!
//! Clients are only ever addressed through their application's key.

use super::DbPool;
use crate::domain::{Client, CreateClientInput, StringUuid};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Insert a client under the application identified by `app_key`.
    ///
    /// `NotFound` when the application does not exist, `Conflict` when the
    /// client id is already used inside that application.
    async fn create(
        &self,
        app_key: &str,
        client_id: &str,
        secret_hash: &str,
        input: &CreateClientInput,
    ) -> Result<Client>;
    async fn find(&self, app_key: &str, client_id: &str) -> Result<Option<Client>>;
    async fn list_by_application(&self, application_id: StringUuid) -> Result<Vec<Client>>;
}

pub struct ClientRepositoryImpl {
    pool: DbPool,
}

impl ClientRepositoryImpl {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepository for ClientRepositoryImpl {
    async fn create(
        &self,
        app_key: &str,
        client_id: &str,
        secret_hash: &str,
        input: &CreateClientInput,
    ) -> Result<Client> {
        let inserted = self
            .pool
            .with_deadline(
                sqlx::query(
                    r#"
                    INSERT INTO clients (id, application_id, client_id, secret_hash, name, created_at)
                    SELECT ?, a.id, ?, ?, ?, ?
                    FROM applications a
                    WHERE a.app_key = ?
                    "#,
                )
                .bind(StringUuid::new_v4())
                .bind(client_id)
                .bind(secret_hash)
                .bind(&input.name)
                .bind(Utc::now().trunc_subsecs(0))
                .bind(app_key)
                .execute(self.pool.inner()),
            )
            .await;

        match inserted {
            Ok(result) if result.rows_affected() == 0 => Err(AppError::NotFound(format!(
                "Application '{}' not found",
                app_key
            ))),
            Ok(_) => self.find(app_key, client_id).await?.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("Failed to read back created client"))
            }),
            Err(AppError::Database(e)) if AppError::is_unique_violation(&e) => {
                Err(AppError::Conflict(format!(
                    "Client '{}' already exists in application '{}'",
                    client_id, app_key
                )))
            }
            Err(e) => Err(e),
        }
    }

    async fn find(&self, app_key: &str, client_id: &str) -> Result<Option<Client>> {
        self.pool
            .with_deadline(
                sqlx::query_as::<_, Client>(
                    r#"
                    SELECT c.id, c.application_id, c.client_id, c.secret_hash, c.name, c.created_at
                    FROM clients c
                    INNER JOIN applications a ON a.id = c.application_id
                    WHERE a.app_key = ? AND c.client_id = ?
                    "#,
                )
                .bind(app_key)
                .bind(client_id)
                .fetch_optional(self.pool.inner()),
            )
            .await
    }

    async fn list_by_application(&self, application_id: StringUuid) -> Result<Vec<Client>> {
        self.pool
            .with_deadline(
                sqlx::query_as::<_, Client>(
                    r#"
                    SELECT id, application_id, client_id, secret_hash, name, created_at
                    FROM clients
                    WHERE application_id = ?
                    ORDER BY created_at ASC, client_id ASC
                    "#,
                )
                .bind(application_id)
                .fetch_all(self.pool.inner()),
            )
            .await
    }
}
