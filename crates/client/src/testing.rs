//! In-process fakes shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use careerhub_auth::{AccessToken, AppRoute, Principal, Role, Session};
use careerhub_core::{Email, UserId};

use crate::api::{RefreshedToken, SessionBackend};
use crate::error::SessionError;
use crate::navigation::Navigator;
use crate::token_store::TokenStore;

pub(crate) const PASSWORD: &str = "correct horse";

pub(crate) fn principal(role: Role) -> Principal {
    Principal {
        user_id: UserId::new("usr_1").unwrap(),
        role,
        onboarding_completed: role != Role::NewUser,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefreshBehaviour {
    Succeed,
    Reject,
    /// Wait on the gate before succeeding.
    Gated,
    /// Wait on the gate, then reject (credential revoked meanwhile).
    GatedReject,
    Hang,
}

/// Scriptable backend that writes the token store like the real one does.
pub(crate) struct FakeBackend {
    pub tokens: TokenStore,
    pub role: Mutex<Role>,
    pub refresh: Mutex<RefreshBehaviour>,
    pub gate: Notify,
    pub refresh_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub otp_sent: AtomicUsize,
}

impl FakeBackend {
    pub fn new(tokens: TokenStore) -> Arc<Self> {
        Arc::new(Self {
            tokens,
            role: Mutex::new(Role::Learner),
            refresh: Mutex::new(RefreshBehaviour::Succeed),
            gate: Notify::new(),
            refresh_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            otp_sent: AtomicUsize::new(0),
        })
    }

    pub fn set_refresh(&self, behaviour: RefreshBehaviour) {
        *self.refresh.lock().unwrap() = behaviour;
    }

    pub fn set_role(&self, role: Role) {
        *self.role.lock().unwrap() = role;
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn issue(&self, value: &str) -> Session {
        let token = AccessToken::expiring_in(value, 300, Utc::now());
        self.tokens.replace(Some(token.clone()));
        Session {
            principal: principal(*self.role.lock().unwrap()),
            token,
        }
    }
}

#[async_trait]
impl SessionBackend for FakeBackend {
    async fn sign_in(&self, _email: &Email, password: &str, _remember_me: bool) -> Result<Session, SessionError> {
        if password != PASSWORD {
            return Err(SessionError::InvalidCredentials("wrong password".to_string()));
        }
        Ok(self.issue("token-0"))
    }

    async fn refresh(&self) -> Result<RefreshedToken, SessionError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let behaviour = *self.refresh.lock().unwrap();
        match behaviour {
            RefreshBehaviour::Succeed => {}
            RefreshBehaviour::Reject => {
                return Err(SessionError::RefreshFailed("refresh token revoked".to_string()));
            }
            RefreshBehaviour::Gated => self.gate.notified().await,
            RefreshBehaviour::GatedReject => {
                self.gate.notified().await;
                return Err(SessionError::RefreshFailed("refresh token revoked".to_string()));
            }
            RefreshBehaviour::Hang => std::future::pending::<()>().await,
        }
        Ok(RefreshedToken {
            access_token: format!("token-{n}"),
            expires_in: Some(300),
        })
    }

    async fn sign_out(&self) {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn send_otp(&self, _email: &Email) -> Result<(), SessionError> {
        self.otp_sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn verify_otp(&self, _email: &Email, code: &str) -> Result<Session, SessionError> {
        if code != "123456" {
            return Err(SessionError::InvalidOtp("code mismatch".to_string()));
        }
        Ok(self.issue("token-otp"))
    }

    async fn me(&self) -> Result<Principal, SessionError> {
        if self.tokens.get().is_none() {
            return Err(SessionError::Api("not authenticated".to_string()));
        }
        Ok(principal(*self.role.lock().unwrap()))
    }
}

/// Navigator that records every redirect.
#[derive(Default)]
pub(crate) struct RecordingNavigator {
    pub routes: Mutex<Vec<AppRoute>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<AppRoute> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: AppRoute) {
        self.routes.lock().unwrap().push(route);
    }
}
