use serde::{Deserialize, Serialize};

use careerhub_core::UserId;

use crate::{AccessToken, Role};

/// Identity half of a session: who the user is and what they may reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    #[serde(rename = "id")]
    pub user_id: UserId,
    pub role: Role,
    #[serde(default)]
    pub onboarding_completed: bool,
}

/// A live, in-memory session.
///
/// Never persisted: only the opaque refresh credential survives a reload, and
/// it lives in a server-controlled cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub principal: Principal,
    pub token: AccessToken,
}

impl Session {
    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn user_id(&self) -> &UserId {
        &self.principal.user_id
    }
}

/// Authentication status as observed by views and background tasks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthStatus {
    /// Session state not yet resolved (cold load, rehydration in progress).
    #[default]
    Loading,
    Anonymous,
    Authenticated(Session),
}

impl AuthStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthStatus::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthStatus::Authenticated(session) => Some(session),
            AuthStatus::Loading | AuthStatus::Anonymous => None,
        }
    }
}
