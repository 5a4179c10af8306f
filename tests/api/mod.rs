//! API integration tests infrastructure
//!
//! In-memory repositories standing in for MySQL. Uniqueness is enforced under
//! the write lock so concurrent tests see the same Conflict behavior as the
//! store's unique indexes.


use async_trait::async_trait;
use authx_core::config::JwtConfig;
use authx_core::domain::{Application, Client, CreateApplicationInput, CreateClientInput, StringUuid, User};
use authx_core::error::{AppError, Result};
use authx_core::jwt::{JwtManager, Subject};
use authx_core::repository::{ApplicationRepository, ClientRepository, UserRepository};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// Test JWT helpers
// ============================================================================

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-key-for-http-testing".to_string(),
        issuer: "https://authx.test".to_string(),
        audience: "authx-api".to_string(),
        user_token_ttl_secs: 3600,
        client_token_ttl_secs: 900,
    }
}

pub fn create_test_jwt_manager() -> JwtManager {
    JwtManager::new(test_jwt_config()).unwrap()
}

pub fn user_token(jwt: &JwtManager, id: StringUuid, email: &str) -> String {
    jwt.issue(&Subject::User {
        id,
        email: email.to_string(),
    })
    .unwrap()
    .token
}

pub fn client_token(jwt: &JwtManager, client_id: &str, app_key: &str) -> String {
    jwt.issue(&Subject::Client {
        client_id: client_id.to_string(),
        app_key: app_key.to_string(),
    })
    .unwrap()
    .token
}

fn unavailable() -> AppError {
    AppError::StoreUnavailable("test store is down".to_string())
}

// ============================================================================
// Test User Repository
// ============================================================================

#[derive(Default)]
pub struct TestUserRepository {
    users: RwLock<Vec<User>>,
}

impl TestUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserRepository for TestUserRepository {
    async fn create(&self, email: &str, password_hash: &str) -> Result<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == email) {
            return Err(AppError::Conflict(format!(
                "User with email '{}' already exists",
                email
            )));
        }
        let user = User {
            id: StringUuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }
}

// ============================================================================
// Test Application Repository
// ============================================================================

#[derive(Default)]
pub struct TestApplicationRepository {
    applications: RwLock<Vec<Application>>,
    unavailable: AtomicBool,
}

impl TestApplicationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an application with a known key
    pub async fn add_application(&self, owner_id: StringUuid, app_key: &str) -> Application {
        let application = Application {
            app_key: app_key.to_string(),
            owner_id,
            name: format!("{} app", app_key),
            ..Default::default()
        };
        self.applications.write().await.push(application.clone());
        application
    }

    /// Make every call fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn is_unavailable(&self) -> bool {
        self.unavailable.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_unavailable() {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl ApplicationRepository for TestApplicationRepository {
    async fn create(
        &self,
        owner_id: StringUuid,
        app_key: &str,
        input: &CreateApplicationInput,
    ) -> Result<Application> {
        self.check()?;
        let mut applications = self.applications.write().await;
        if applications.iter().any(|a| a.app_key == app_key) {
            return Err(AppError::Conflict("Application key already exists".to_string()));
        }
        let application = Application {
            id: StringUuid::new_v4(),
            app_key: app_key.to_string(),
            owner_id,
            name: input.name.clone(),
            created_at: Utc::now(),
        };
        applications.push(application.clone());
        Ok(application)
    }

    async fn find_by_key(&self, app_key: &str) -> Result<Option<Application>> {
        self.check()?;
        let applications = self.applications.read().await;
        Ok(applications.iter().find(|a| a.app_key == app_key).cloned())
    }

    async fn list_by_owner(&self, owner_id: StringUuid) -> Result<Vec<Application>> {
        self.check()?;
        let applications = self.applications.read().await;
        Ok(applications
            .iter()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Test Client Repository
// ============================================================================

/// Clients are stored next to the application list they belong to, the way the
/// SQL repository joins on `applications.app_key`.
pub struct TestClientRepository {
    applications: Arc<TestApplicationRepository>,
    clients: RwLock<Vec<Client>>,
}

impl TestClientRepository {
    pub fn new(applications: Arc<TestApplicationRepository>) -> Self {
        Self {
            applications,
            clients: RwLock::new(vec![]),
        }
    }
}

#[async_trait]
impl ClientRepository for TestClientRepository {
    async fn create(
        &self,
        app_key: &str,
        client_id: &str,
        secret_hash: &str,
        input: &CreateClientInput,
    ) -> Result<Client> {
        let application = self
            .applications
            .find_by_key(app_key)
            .await?
            .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

        let mut clients = self.clients.write().await;
        if clients
            .iter()
            .any(|c| c.application_id == application.id && c.client_id == client_id)
        {
            return Err(AppError::Conflict("Client id already exists".to_string()));
        }
        let client = Client {
            id: StringUuid::new_v4(),
            application_id: application.id,
            client_id: client_id.to_string(),
            secret_hash: secret_hash.to_string(),
            name: input.name.clone(),
            created_at: Utc::now(),
        };
        clients.push(client.clone());
        Ok(client)
    }

    async fn find(&self, app_key: &str, client_id: &str) -> Result<Option<Client>> {
        let Some(application) = self.applications.find_by_key(app_key).await? else {
            return Ok(None);
        };
        let clients = self.clients.read().await;
        Ok(clients
            .iter()
            .find(|c| c.application_id == application.id && c.client_id == client_id)
            .cloned())
    }

    async fn list_by_application(&self, application_id: StringUuid) -> Result<Vec<Client>> {
        self.applications.check()?;
        let clients = self.clients.read().await;
        Ok(clients
            .iter()
            .filter(|c| c.application_id == application_id)
            .cloned()
            .collect())
    }
}
