//! Business logic layer

pub mod application;
pub mod identity;

pub use application::ApplicationService;
pub use identity::IdentityService;
