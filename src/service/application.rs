//! Applications, their clients and client credential checks

use crate::crypto;
use crate::domain::{
    Application, ApplicationWithClients, Client, ClientTokenInput, ClientWithSecret,
    CreateApplicationInput, CreateClientInput, StringUuid,
};
use crate::error::{AppError, Result};
use crate::repository::{ApplicationRepository, ClientRepository};
use std::sync::Arc;
use validator::Validate;

pub struct ApplicationService<A: ApplicationRepository, C: ClientRepository> {
    app_repo: Arc<A>,
    client_repo: Arc<C>,
}

impl<A: ApplicationRepository, C: ClientRepository> ApplicationService<A, C> {
    pub fn new(app_repo: Arc<A>, client_repo: Arc<C>) -> Self {
        Self {
            app_repo,
            client_repo,
        }
    }

    pub async fn create(
        &self,
        owner_id: StringUuid,
        input: CreateApplicationInput,
    ) -> Result<Application> {
        input.validate()?;
        let app_key = crypto::generate_app_key();
        let application = self.app_repo.create(owner_id, &app_key, &input).await?;
        tracing::info!(app_key = %application.app_key, owner_id = %owner_id, "Application created");
        Ok(application)
    }

    pub async fn list_for_owner(&self, owner_id: StringUuid) -> Result<Vec<Application>> {
        self.app_repo.list_by_owner(owner_id).await
    }

    /// Ownership fact lookup, no error for a missing key
    pub async fn find(&self, app_key: &str) -> Result<Option<Application>> {
        self.app_repo.find_by_key(app_key).await
    }

    pub async fn get(&self, app_key: &str) -> Result<Application> {
        self.find(app_key)
            .await?
            .ok_or_else(|| AppError::NotFound("Not found".to_string()))
    }

    pub async fn get_with_clients(&self, app_key: &str) -> Result<ApplicationWithClients> {
        let application = self.get(app_key).await?;
        let clients = self.client_repo.list_by_application(application.id).await?;
        Ok(ApplicationWithClients {
            application,
            clients,
        })
    }

    /// Create a client; the plaintext secret is returned once and only its hash stored.
    pub async fn create_client(
        &self,
        app_key: &str,
        input: CreateClientInput,
    ) -> Result<ClientWithSecret> {
        input.validate()?;
        let client_id = crypto::generate_client_id();
        let client_secret = crypto::generate_secret();
        let secret_hash = crypto::hash_secret(&client_secret)?;

        let client = self
            .client_repo
            .create(app_key, &client_id, &secret_hash, &input)
            .await?;
        tracing::info!(app_key = %app_key, client_id = %client.client_id, "Client created");

        Ok(ClientWithSecret {
            client,
            client_secret,
        })
    }

    pub async fn get_client(&self, app_key: &str, client_id: &str) -> Result<Client> {
        self.client_repo
            .find(app_key, client_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Not found".to_string()))
    }

    /// Client credential check. Any mismatch is the same `NotFound`.
    pub async fn authenticate_client(&self, input: &ClientTokenInput) -> Result<Client> {
        let verified = match self.client_repo.find(&input.app_key, &input.client_id).await? {
            Some(client) => crypto::verify_secret(&client.secret_hash, &input.client_secret)
                .then_some(client),
            None => {
                crypto::reject_unknown(&input.client_secret);
                None
            }
        };
        verified.ok_or_else(|| AppError::NotFound("Invalid client credentials".to_string()))
    }
}
