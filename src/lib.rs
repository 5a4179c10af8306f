//! Authx Core - multi-tenant identity service
//!
//! Users sign up and log in for signed tokens, own applications, and mint
//! client credentials scoped to one application. The same process serves either
//! the REST API or an authorizing gateway in front of per-application upstreams.

pub mod api;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod jwt;
pub mod middleware;
pub mod migration;
pub mod policy;
pub mod repository;
pub mod server;
pub mod service;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
