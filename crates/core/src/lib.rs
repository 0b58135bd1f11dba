//! `careerhub-core`: shared primitives for the session lifecycle.
//!
//! This crate contains **pure** value types (no IO, no transport concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{Email, UserId};
