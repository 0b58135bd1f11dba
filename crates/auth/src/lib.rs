//! `careerhub-auth`: pure session/authorization policy.
//!
//! This crate is intentionally decoupled from HTTP, timers and storage: it
//! decides, callers act.

pub mod classifier;
pub mod guard;
pub mod roles;
pub mod routes;
pub mod session;
pub mod token;

pub use classifier::{EdgeDecision, RouteClass, RouteClassifier, SESSION_EVIDENCE_COOKIE};
pub use guard::{GuardDecision, RoleGuard, evaluate};
pub use roles::{Role, RoleRequirement, UnknownRole};
pub use routes::AppRoute;
pub use session::{AuthStatus, Principal, Session};
pub use token::AccessToken;
