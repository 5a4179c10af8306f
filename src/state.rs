//! Application state trait for dependency injection
//!
//! Handlers, the request gate and the routers are generic over [`HasServices`],
//! so the production `AppState` and the in-memory test state share one router.

use crate::config::Config;
use crate::gateway::GatewayForwarder;
use crate::jwt::JwtManager;
use crate::repository::{ApplicationRepository, ClientRepository, UserRepository};
use crate::service::{ApplicationService, IdentityService};

/// Trait for application state that provides access to all services.
pub trait HasServices: Clone + Send + Sync + 'static {
    /// The user repository type
    type UserRepo: UserRepository;
    /// The application repository type
    type ApplicationRepo: ApplicationRepository;
    /// The client repository type
    type ClientRepo: ClientRepository;

    /// Get the application configuration
    fn config(&self) -> &Config;

    /// Signup, login and user lookup
    fn identity_service(&self) -> &IdentityService<Self::UserRepo>;

    /// Applications, clients and client credentials
    fn application_service(&self) -> &ApplicationService<Self::ApplicationRepo, Self::ClientRepo>;

    /// Get the JWT manager
    fn jwt_manager(&self) -> &JwtManager;

    /// Upstream forwarder used in gateway mode
    fn gateway(&self) -> &GatewayForwarder;

    /// True when the identity store answers within its deadline
    fn check_ready(&self) -> impl std::future::Future<Output = bool> + Send;
}
