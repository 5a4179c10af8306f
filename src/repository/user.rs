//! User repository

use super::DbPool;
use crate::domain::{StringUuid, User};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Fails with `Conflict` when the email is taken.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User>;
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}

pub struct UserRepositoryImpl {
    pool: DbPool,
}

impl UserRepositoryImpl {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn create(&self, email: &str, password_hash: &str) -> Result<User> {
        let user = User {
            id: StringUuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now().trunc_subsecs(0),
        };

        let inserted = self
            .pool
            .with_deadline(
                sqlx::query(
                    r#"
                    INSERT INTO users (id, email, password_hash, created_at)
                    VALUES (?, ?, ?, ?)
                    "#,
                )
                .bind(user.id)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(user.created_at)
                .execute(self.pool.inner()),
            )
            .await;

        match inserted {
            Ok(_) => Ok(user),
            Err(AppError::Database(e)) if AppError::is_unique_violation(&e) => Err(
                AppError::Conflict(format!("User with email '{}' already exists", email)),
            ),
            Err(e) => Err(e),
        }
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<User>> {
        self.pool
            .with_deadline(
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, email, password_hash, created_at
                    FROM users
                    WHERE id = ?
                    "#,
                )
                .bind(id)
                .fetch_optional(self.pool.inner()),
            )
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.pool
            .with_deadline(
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, email, password_hash, created_at
                    FROM users
                    WHERE email = ?
                    "#,
                )
                .bind(email)
                .fetch_optional(self.pool.inner()),
            )
            .await
    }
}
