//! Data access layer (Repository pattern)

pub mod application;
pub mod client;
pub mod user;

pub use application::ApplicationRepository;
pub use client::ClientRepository;
pub use user::UserRepository;

use crate::error::{AppError, Result};
use sqlx::MySqlPool;
use std::future::Future;
use std::time::Duration;

/// Database connection pool wrapper carrying the per-call deadline
#[derive(Clone)]
pub struct DbPool {
    pool: MySqlPool,
    query_timeout: Duration,
}

impl DbPool {
    pub fn new(pool: MySqlPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    pub fn inner(&self) -> &MySqlPool {
        &self.pool
    }

    /// Run one store call under the configured deadline.
    ///
    /// A call that outlives the deadline is reported as `StoreUnavailable`.
    pub async fn with_deadline<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, call).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::StoreUnavailable(format!(
                "store call exceeded {}ms",
                self.query_timeout.as_millis()
            ))),
        }
    }

    pub async fn ping(&self) -> bool {
        self.with_deadline(sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .is_ok()
    }
}

impl std::ops::Deref for DbPool {
    type Target = MySqlPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}
