//! Token issuance and verification
//!
//! Tokens are stateless HS256 JWTs. Nothing is stored server side, so every use
//! re-checks the signature, issuer, audience and expiry.

use crate::config::JwtConfig;
use crate::domain::StringUuid;
use crate::error::{AppError, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use serde::{Deserialize, Serialize};

/// Kind of entity a token stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    User,
    Client,
}

impl SubjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::User => "user",
            SubjectType::Client => "client",
        }
    }
}

/// Verified identity carried by a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "subject_type", rename_all = "lowercase")]
pub enum Subject {
    User { id: StringUuid, email: String },
    /// A client is scoped to exactly one application
    Client { client_id: String, app_key: String },
}

impl Subject {
    pub fn subject_type(&self) -> SubjectType {
        match self {
            Subject::User { .. } => SubjectType::User,
            Subject::Client { .. } => SubjectType::Client,
        }
    }

    pub fn subject_id(&self) -> String {
        match self {
            Subject::User { id, .. } => id.to_string(),
            Subject::Client { client_id, .. } => client_id.clone(),
        }
    }

    /// Application scope of a client token
    pub fn application(&self) -> Option<&str> {
        match self {
            Subject::User { .. } => None,
            Subject::Client { app_key, .. } => Some(app_key),
        }
    }
}

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id or client id)
    pub sub: String,
    pub sub_type: SubjectType,
    /// Application key, present only for client tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Rebuild the subject, rejecting claim sets that mix user and client fields.
    pub fn subject(&self) -> Result<Subject> {
        match (self.sub_type, &self.app) {
            (SubjectType::User, None) => {
                let id = self
                    .sub
                    .parse::<StringUuid>()
                    .map_err(|_| AppError::TokenInvalid("Invalid user id in token".to_string()))?;
                Ok(Subject::User {
                    id,
                    email: self.email.clone().unwrap_or_default(),
                })
            }
            (SubjectType::Client, Some(app_key)) if !app_key.is_empty() && !self.sub.is_empty() => {
                Ok(Subject::Client {
                    client_id: self.sub.clone(),
                    app_key: app_key.clone(),
                })
            }
            _ => Err(AppError::TokenInvalid(
                "Subject type and application scope disagree".to_string(),
            )),
        }
    }
}

/// A freshly signed token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: String,
    /// Seconds until expiry
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
}

/// JWT token manager
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl JwtManager {
    /// Fails when no signing secret is configured.
    pub fn new(config: JwtConfig) -> Result<Self> {
        if config.secret.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "JWT signing secret is not configured"
            )));
        }
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Ok(Self {
            config,
            encoding_key,
            decoding_key,
            algorithm: Algorithm::HS256,
        })
    }

    /// Expiry is enforced to the second, with no leeway.
    fn strict_validation(&self) -> Validation {
        let mut v = Validation::new(self.algorithm);
        v.leeway = 0;
        v.set_audience(&[&self.config.audience]);
        v.set_issuer(&[&self.config.issuer]);
        v
    }

    /// Configured lifetime for a subject type
    pub fn ttl_for(&self, subject_type: SubjectType) -> Duration {
        match subject_type {
            SubjectType::User => Duration::seconds(self.config.user_token_ttl_secs),
            SubjectType::Client => Duration::seconds(self.config.client_token_ttl_secs),
        }
    }

    /// Issue a token with the configured lifetime for the subject
    pub fn issue(&self, subject: &Subject) -> Result<IssuedToken> {
        self.issue_with_ttl(subject, self.ttl_for(subject.subject_type()))
    }

    pub fn issue_with_ttl(&self, subject: &Subject, ttl: Duration) -> Result<IssuedToken> {
        self.issue_at(subject, ttl, Utc::now())
    }

    fn issue_at(&self, subject: &Subject, ttl: Duration, now: DateTime<Utc>) -> Result<IssuedToken> {
        let expires_at = now + ttl;
        let claims = Claims {
            sub: subject.subject_id(),
            sub_type: subject.subject_type(),
            app: subject.application().map(str::to_string),
            email: match subject {
                Subject::User { email, .. } => Some(email.clone()),
                Subject::Client { .. } => None,
            },
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(e.into()))?;

        counter!("authx_tokens_issued_total", "subject_type" => subject.subject_type().as_str())
            .increment(1);

        Ok(IssuedToken {
            token,
            token_type: "Bearer".to_string(),
            expires_in: ttl.num_seconds(),
            expires_at,
        })
    }

    /// Verify signature, issuer, audience and expiry.
    ///
    /// Expired tokens yield `TokenExpired`; everything else `TokenInvalid`.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.strict_validation())?;
        Ok(token_data.claims)
    }

    /// Verify and rebuild the subject in one step
    pub fn verify_subject(&self, token: &str) -> Result<Subject> {
        self.verify(token)?.subject()
    }
}
