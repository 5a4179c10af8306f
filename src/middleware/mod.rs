//! HTTP middleware for Authx Core
//!
//! - `gate`: the request gate that verifies tokens and consults the policy engine
//! - `auth`: the `AuthContext` extractor handlers read the resolved identity from
//! - error normalization, observability and trace span helpers

pub mod auth;
pub mod error_response;
pub mod gate;
pub mod metrics;
pub mod trace;

pub use auth::AuthContext;
pub use error_response::normalize_error_response;
pub use gate::{api_gate, gateway_gate};
pub use metrics::ObservabilityLayer;
pub use trace::SanitizedMakeSpan;
