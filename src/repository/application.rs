//! Application repository

use super::DbPool;
use crate::domain::{Application, CreateApplicationInput, StringUuid};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Insert an application. Fails with `Conflict` when the key is taken.
    async fn create(
        &self,
        owner_id: StringUuid,
        app_key: &str,
        input: &CreateApplicationInput,
    ) -> Result<Application>;
    async fn find_by_key(&self, app_key: &str) -> Result<Option<Application>>;
    async fn list_by_owner(&self, owner_id: StringUuid) -> Result<Vec<Application>>;
}

pub struct ApplicationRepositoryImpl {
    pool: DbPool,
}

impl ApplicationRepositoryImpl {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationRepository for ApplicationRepositoryImpl {
    async fn create(
        &self,
        owner_id: StringUuid,
        app_key: &str,
        input: &CreateApplicationInput,
    ) -> Result<Application> {
        let application = Application {
            id: StringUuid::new_v4(),
            app_key: app_key.to_string(),
            owner_id,
            name: input.name.clone(),
            created_at: Utc::now().trunc_subsecs(0),
        };

        let inserted = self
            .pool
            .with_deadline(
                sqlx::query(
                    r#"
                    INSERT INTO applications (id, app_key, owner_id, name, created_at)
                    VALUES (?, ?, ?, ?, ?)
                    "#,
                )
                .bind(application.id)
                .bind(&application.app_key)
                .bind(application.owner_id)
                .bind(&application.name)
                .bind(application.created_at)
                .execute(self.pool.inner()),
            )
            .await;

        match inserted {
            Ok(_) => Ok(application),
            Err(AppError::Database(e)) if AppError::is_unique_violation(&e) => Err(
                AppError::Conflict(format!("Application key '{}' already exists", app_key)),
            ),
            Err(e) => Err(e),
        }
    }

    async fn find_by_key(&self, app_key: &str) -> Result<Option<Application>> {
        self.pool
            .with_deadline(
                sqlx::query_as::<_, Application>(
                    r#"
                    SELECT id, app_key, owner_id, name, created_at
                    FROM applications
                    WHERE app_key = ?
                    "#,
                )
                .bind(app_key)
                .fetch_optional(self.pool.inner()),
            )
            .await
    }

    async fn list_by_owner(&self, owner_id: StringUuid) -> Result<Vec<Application>> {
        self.pool
            .with_deadline(
                sqlx::query_as::<_, Application>(
                    r#"
                    SELECT id, app_key, owner_id, name, created_at
                    FROM applications
                    WHERE owner_id = ?
                    ORDER BY created_at ASC, app_key ASC
                    "#,
                )
                .bind(owner_id)
                .fetch_all(self.pool.inner()),
            )
            .await
    }
}
