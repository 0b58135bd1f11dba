//! Page-level role guard.
//!
//! The edge filter only knows whether a session *could* exist. The guard runs
//! inside the page against the in-memory role and decides whether the render
//! proceeds or the user is sent elsewhere.

use std::sync::Mutex;

use careerhub_core::UserId;

use crate::{AppRoute, AuthStatus, Role, RoleRequirement};

/// Outcome of evaluating a role requirement against the current status.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session state still loading; no decision yet.
    Pending,
    /// Render proceeds.
    Allow,
    Redirect(AppRoute),
}

/// Evaluate a requirement against the current auth status.
///
/// - No IO
/// - No panics
/// - Same inputs, same decision
pub fn evaluate(status: &AuthStatus, requirement: &RoleRequirement) -> GuardDecision {
    let session = match status {
        AuthStatus::Loading => return GuardDecision::Pending,
        AuthStatus::Anonymous => return GuardDecision::Redirect(AppRoute::SignIn),
        AuthStatus::Authenticated(session) => session,
    };

    let role = session.role();
    if requirement.allows(role) {
        return GuardDecision::Allow;
    }

    match role {
        // Transitional state, not a violation.
        Role::NewUser => GuardDecision::Redirect(AppRoute::Onboarding),
        Role::Learner
        | Role::Mentor
        | Role::Admin
        | Role::SuperAdmin
        | Role::Moderator
        | Role::HrManager
        | Role::Recruiter
        | Role::PremiumUser
        | Role::VipMentor => GuardDecision::Redirect(AppRoute::Unauthorized),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Identity {
    Anonymous,
    User(UserId, Role),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IssuedRedirect {
    identity: Identity,
    requirement: RoleRequirement,
    target: AppRoute,
}

/// Stateful wrapper around [`evaluate`] that issues each redirect once.
///
/// A view re-renders many times; re-running the check after a redirect has
/// already been issued for the same (session, requirement) pair must not issue
/// another one, or the app loops.
#[derive(Debug, Default)]
pub struct RoleGuard {
    issued: Mutex<Option<IssuedRedirect>>,
}

impl RoleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the redirect to perform now, if any.
    pub fn check(&self, status: &AuthStatus, requirement: &RoleRequirement) -> Option<AppRoute> {
        let decision = evaluate(status, requirement);
        let mut issued = self.issued.lock().unwrap_or_else(|e| e.into_inner());

        match decision {
            GuardDecision::Pending => None,
            GuardDecision::Allow => {
                *issued = None;
                None
            }
            GuardDecision::Redirect(target) => {
                let identity = match status.session() {
                    Some(session) => Identity::User(session.user_id().clone(), session.role()),
                    None => Identity::Anonymous,
                };
                let candidate = IssuedRedirect {
                    identity,
                    requirement: requirement.clone(),
                    target,
                };

                if issued.as_ref() == Some(&candidate) {
                    tracing::debug!(%target, "redirect already issued; suppressing");
                    return None;
                }

                tracing::info!(%target, "role guard redirect");
                *issued = Some(candidate);
                Some(target)
            }
        }
    }

    /// Forget the last issued redirect (e.g. when the owning view is torn down).
    pub fn reset(&self) {
        *self.issued.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
