//! Authorization decision engine.
//!
//! `authorize` is a pure function of the verified subject, the requested
//! resource and the ownership facts the caller fetched from the store.

use crate::domain::Application;
use crate::jwt::Subject;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    ApplicationList,
    ApplicationCreate,
    ApplicationRead,
    ClientCreate,
    ClientRead,
    GatewayForward,
}

impl PolicyAction {
    /// Actions a client token may perform inside its own application
    fn permits_client(self) -> bool {
        matches!(
            self,
            PolicyAction::ApplicationRead | PolicyAction::ClientRead | PolicyAction::GatewayForward
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyAction::ApplicationList => "application_list",
            PolicyAction::ApplicationCreate => "application_create",
            PolicyAction::ApplicationRead => "application_read",
            PolicyAction::ClientCreate => "client_create",
            PolicyAction::ClientRead => "client_read",
            PolicyAction::GatewayForward => "gateway_forward",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceScope {
    /// Not tied to an application, e.g. "list my applications"
    Global,
    Application(String),
}

impl ResourceScope {
    pub fn app_key(&self) -> Option<&str> {
        match self {
            ResourceScope::Global => None,
            ResourceScope::Application(key) => Some(key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyInput {
    pub action: PolicyAction,
    pub scope: ResourceScope,
}

impl PolicyInput {
    pub fn global(action: PolicyAction) -> Self {
        Self {
            action,
            scope: ResourceScope::Global,
        }
    }

    pub fn application(action: PolicyAction, app_key: impl Into<String>) -> Self {
        Self {
            action,
            scope: ResourceScope::Application(app_key.into()),
        }
    }
}

/// Effective scope of an allowed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessScope {
    Owner,
    Client,
    /// Enforcement disabled and no credentials presented
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    Unauthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(AccessScope),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

pub fn authorize(
    subject: Option<&Subject>,
    input: &PolicyInput,
    application: Option<&Application>,
) -> Decision {
    let Some(subject) = subject else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    // Facts must describe the requested application.
    let target = match (&input.scope, application) {
        (ResourceScope::Application(key), Some(app)) if app.app_key == *key => Some(app),
        _ => None,
    };

    match subject {
        Subject::User { id, .. } => match &input.scope {
            ResourceScope::Global => Decision::Allow(AccessScope::Owner),
            ResourceScope::Application(_) => match target {
                Some(app) if app.owner_id == *id => Decision::Allow(AccessScope::Owner),
                _ => Decision::Deny(DenyReason::Unauthorized),
            },
        },
        Subject::Client { app_key, .. } => match (&input.scope, target) {
            (ResourceScope::Application(key), Some(_))
                if key == app_key && input.action.permits_client() =>
            {
                Decision::Allow(AccessScope::Client)
            }
            _ => Decision::Deny(DenyReason::Unauthorized),
        },
    }
}
