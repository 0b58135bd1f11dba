//! Session orchestrator.
//!
//! The API client exchanges credentials; this type decides what the outcome
//! means for the session. It is the only place a session is ended.
//!
//! Every session start or end bumps an epoch under the status lock. A refresh
//! remembers the epoch it was started in and only lands if that session is
//! still the live one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, watch};

use careerhub_auth::{AccessToken, AppRoute, AuthStatus, RoleGuard, RoleRequirement, Session};
use careerhub_core::{DomainError, Email};

use crate::api::SessionBackend;
use crate::error::SessionError;
use crate::navigation::Navigator;
use crate::token_store::TokenStore;

/// Why a session was ended without the user asking.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EndReason {
    RefreshFailed,
    IdleTimeout,
    /// Session evidence disappeared (e.g. refresh cookie cleared elsewhere).
    EvidenceLost,
}

impl core::fmt::Display for EndReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EndReason::RefreshFailed => f.write_str("refresh_failed"),
            EndReason::IdleTimeout => f.write_str("idle_timeout"),
            EndReason::EvidenceLost => f.write_str("evidence_lost"),
        }
    }
}

pub struct SessionManager {
    backend: Arc<dyn SessionBackend>,
    tokens: TokenStore,
    status: watch::Sender<AuthStatus>,
    /// Session generation. Only written inside the `status` lock.
    epoch: AtomicU64,
    /// Single-flight slot shared by background and render-time refreshes.
    refresh_slot: Mutex<()>,
    navigator: Arc<dyn Navigator>,
    guard: RoleGuard,
}

impl SessionManager {
    /// `tokens` must be the same store the backend writes to.
    pub fn new(backend: Arc<dyn SessionBackend>, tokens: TokenStore, navigator: Arc<dyn Navigator>) -> Self {
        let (status, _) = watch::channel(AuthStatus::Loading);
        Self {
            backend,
            tokens,
            status,
            epoch: AtomicU64::new(0),
            refresh_slot: Mutex::new(()),
            navigator,
            guard: RoleGuard::new(),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn status(&self) -> AuthStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.status.subscribe()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.status.borrow().session().cloned()
    }

    /// Generation of the current session. Changes whenever a session starts
    /// or ends; a token refresh keeps it.
    ///
    /// Read while holding a borrow of [`subscribe`](Self::subscribe)'s
    /// receiver to get the epoch matching that status.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Publish a new session, unless `expected` is given and another session
    /// change got there first.
    fn begin_session(&self, session: Session, expected: Option<u64>) -> bool {
        self.status.send_if_modified(|status| {
            if expected.is_some_and(|epoch| epoch != self.epoch()) {
                return false;
            }
            self.epoch.fetch_add(1, Ordering::SeqCst);
            self.tokens.replace(Some(session.token.clone()));
            *status = AuthStatus::Authenticated(session);
            true
        })
    }

    /// Store `token` if the session generation is still `epoch`.
    fn store_token(&self, epoch: u64, token: AccessToken) -> bool {
        let mut stored = false;
        self.status.send_if_modified(|_| {
            if self.epoch() == epoch {
                self.tokens.replace(Some(token));
                stored = true;
            }
            false
        });
        stored
    }

    pub async fn sign_in(&self, email: &str, password: &str, remember_me: bool) -> Result<Session, SessionError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(DomainError::validation("password must not be empty").into());
        }

        match self.backend.sign_in(&email, password, remember_me).await {
            Ok(session) => {
                tracing::info!(user_id = %session.user_id(), role = %session.role(), "signed in");
                self.begin_session(session.clone(), None);
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-in failed");
                Err(e)
            }
        }
    }

    pub async fn send_otp(&self, email: &str) -> Result<(), SessionError> {
        let email = Email::parse(email)?;
        self.backend.send_otp(&email).await
    }

    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<Session, SessionError> {
        let email = Email::parse(email)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(DomainError::validation("code must not be empty").into());
        }

        let session = self.backend.verify_otp(&email, code).await?;
        tracing::info!(user_id = %session.user_id(), role = %session.role(), "signed in with one-time code");
        self.begin_session(session.clone(), None);
        Ok(session)
    }

    /// Refresh the access token and republish the session with it.
    ///
    /// Waits for any refresh already in flight; at most one backend call runs
    /// at a time. Does not end the session on failure; callers decide. A
    /// refresh that outlives its session (signed out or replaced meanwhile)
    /// is discarded and reported as `Ok`.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let _slot = self.refresh_slot.lock().await;
        self.refresh_in_slot().await
    }

    async fn refresh_in_slot(&self) -> Result<(), SessionError> {
        let epoch = self.epoch();
        let result = self.backend.refresh().await;

        if self.epoch() != epoch {
            tracing::debug!(succeeded = result.is_ok(), "refresh outlived its session; discarded");
            return Ok(());
        }
        let token = result?.into_token(Utc::now());

        let applied = self.status.send_if_modified(|status| match status {
            AuthStatus::Authenticated(session) if self.epoch() == epoch => {
                self.tokens.replace(Some(token.clone()));
                session.token = token;
                true
            }
            AuthStatus::Loading | AuthStatus::Anonymous | AuthStatus::Authenticated(_) => false,
        });

        if applied {
            tracing::debug!("access token refreshed");
        } else {
            tracing::debug!("no live session; refreshed token discarded");
        }
        Ok(())
    }

    /// Resolve session state on cold load from the refresh cookie alone.
    ///
    /// A rejected refresh just means "not signed in" and is not an error. If a
    /// sign-in or sign-out lands meanwhile, that outcome wins.
    pub async fn rehydrate(&self) -> Result<AuthStatus, SessionError> {
        let _slot = self.refresh_slot.lock().await;
        let epoch = self.epoch();

        let result = match self.backend.refresh().await {
            Ok(refreshed) => {
                let token = refreshed.into_token(Utc::now());
                // `me` is authorised by the fresh token.
                if !self.store_token(epoch, token.clone()) {
                    return Ok(self.status());
                }
                self.backend.me().await.map(|principal| Session { principal, token })
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(session) => {
                let user_id = session.user_id().clone();
                let role = session.role();
                if !self.begin_session(session, Some(epoch)) {
                    return Ok(self.status());
                }
                tracing::info!(%user_id, %role, "session rehydrated");
                Ok(self.status())
            }
            Err(SessionError::RefreshFailed(reason)) => {
                tracing::debug!(%reason, "no session to rehydrate");
                self.clear(Some(epoch));
                Ok(self.status())
            }
            Err(e) => {
                tracing::warn!(error = %e, "rehydration failed");
                self.clear(Some(epoch));
                Err(e)
            }
        }
    }

    /// User-initiated sign-out. Local state goes first; the remote call is
    /// best effort and never fails.
    pub async fn sign_out(&self) {
        self.clear(None);
        self.backend.sign_out().await;
        tracing::info!("signed out");
    }

    /// Sign out without waiting on the network (view teardown, shutdown).
    pub fn sign_out_detached(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.clear(None);
        let backend = self.backend.clone();
        tokio::spawn(async move {
            backend.sign_out().await;
        })
    }

    /// Forced logout: drop the session and send the user to sign-in.
    pub fn end_session(&self, reason: EndReason) {
        self.end(None, reason);
    }

    /// Like [`end_session`](Self::end_session), but only if `epoch` is still
    /// the live session. Used by background tasks whose verdict may be about a
    /// session that has since been replaced.
    pub fn end_session_of(&self, epoch: u64, reason: EndReason) {
        self.end(Some(epoch), reason);
    }

    fn end(&self, expected: Option<u64>, reason: EndReason) {
        if !self.clear(expected) {
            return;
        }
        tracing::info!(%reason, "session ended");
        self.navigator.navigate(AppRoute::SignIn);
    }

    /// Drop token and session. Returns whether there was anything to clear.
    fn clear(&self, expected: Option<u64>) -> bool {
        let mut had_session = false;
        self.status.send_if_modified(|status| {
            if expected.is_some_and(|epoch| epoch != self.epoch()) {
                return false;
            }
            self.epoch.fetch_add(1, Ordering::SeqCst);
            had_session = self.tokens.get().is_some() || status.is_authenticated();
            self.tokens.clear();
            *status = AuthStatus::Anonymous;
            true
        });
        had_session
    }

    /// Run the role guard for a view and perform its redirect, if any.
    ///
    /// An expired access token is refreshed first, through the same slot as
    /// the background refresh; a failed refresh ends the session and the
    /// guard's own sign-in redirect takes over.
    pub async fn guard(&self, requirement: &RoleRequirement) -> Option<AppRoute> {
        if self.needs_refresh() {
            let _slot = self.refresh_slot.lock().await;
            // Whoever held the slot may have renewed the token already.
            if self.needs_refresh() {
                let epoch = self.epoch();
                match self.refresh_in_slot().await {
                    Ok(()) => {}
                    Err(SessionError::RefreshFailed(reason)) => {
                        tracing::info!(%reason, "expired session could not be refreshed");
                        self.clear(Some(epoch));
                    }
                    Err(e) => tracing::warn!(error = %e, "refresh before render failed; keeping session"),
                }
            }
        }

        let redirect = self.guard.check(&self.status.borrow(), requirement);
        if let Some(route) = redirect {
            self.navigator.navigate(route);
        }
        redirect
    }

    fn needs_refresh(&self) -> bool {
        self.status.borrow().is_authenticated() && self.tokens.is_expired(Utc::now())
    }

    /// Release per-view guard state when the view is torn down.
    pub fn release_guard(&self) {
        self.guard.reset();
    }
}
