//! Signup and password login

use crate::crypto;
use crate::domain::{LoginInput, SignupInput, StringUuid, User};
use crate::error::{AppError, Result};
use crate::repository::UserRepository;
use metrics::counter;
use std::sync::Arc;
use validator::Validate;

/// Message shared by every failed login so callers cannot enumerate accounts.
const LOGIN_FAILED: &str = "Invalid email or password";

pub struct IdentityService<R: UserRepository> {
    repo: Arc<R>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl<R: UserRepository> IdentityService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Register a user. A taken email is a `Conflict`, whether caught by the
    /// pre-check or by the store's unique index.
    pub async fn signup(&self, mut input: SignupInput) -> Result<User> {
        input.email = normalize_email(&input.email);
        input.validate()?;
        let email = input.email;

        if self.repo.find_by_email(&email).await?.is_some() {
            counter!("authx_auth_signup_total", "result" => "conflict").increment(1);
            return Err(AppError::Conflict(format!(
                "User with email '{}' already exists",
                email
            )));
        }

        let password_hash = crypto::hash_secret(&input.password)?;
        let result = self.repo.create(&email, &password_hash).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(AppError::Conflict(_)) => "conflict",
            Err(_) => "error",
        };
        counter!("authx_auth_signup_total", "result" => outcome).increment(1);

        let user = result?;
        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Check a password login. Unknown email and wrong password are the same `NotFound`.
    pub async fn authenticate(&self, input: &LoginInput) -> Result<User> {
        let email = normalize_email(&input.email);

        let verified = match self.repo.find_by_email(&email).await? {
            Some(user) => {
                crypto::verify_secret(&user.password_hash, &input.password).then_some(user)
            }
            None => {
                crypto::reject_unknown(&input.password);
                None
            }
        };
        let Some(user) = verified else {
            counter!("authx_auth_login_total", "result" => "failure").increment(1);
            return Err(AppError::NotFound(LOGIN_FAILED.to_string()));
        };

        counter!("authx_auth_login_total", "result" => "success").increment(1);
        Ok(user)
    }

    /// Resolve the user behind a verified token
    pub async fn get(&self, id: StringUuid) -> Result<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }
}
