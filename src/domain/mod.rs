//! Domain models for users, applications and clients

pub mod application;
pub mod common;
pub mod user;

pub use application::*;
pub use common::*;
pub use user::*;
