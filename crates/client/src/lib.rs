//! `careerhub-client`
//!
//! **Responsibility:** client-side session lifecycle against the CareerHub
//! GraphQL backend.
//!
//! This crate provides:
//! - An in-memory token store read by every outgoing GraphQL request
//! - The session API (sign-in, refresh, sign-out, OTP, current user, admin ops)
//! - A session orchestrator that alone decides when a session ends
//! - A refresh scheduler and an idle-activity monitor
//!
//! Redirect decisions come from `careerhub-auth`; this crate acts on them.

pub mod api;
pub mod config;
pub mod error;
pub mod graphql;
pub mod manager;
pub mod monitor;
pub mod navigation;
pub mod scheduler;
pub mod token_store;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

pub use api::{AdminApi, GraphqlSessionApi, RefreshedToken, SessionBackend};
pub use config::{AppEnv, ClientConfig, ConfigError, SchedulerConfig};
pub use error::SessionError;
pub use graphql::{GraphqlClient, GraphqlError};
pub use manager::{EndReason, SessionManager};
pub use monitor::ActivityMonitor;
pub use navigation::{ChannelNavigator, Navigator};
pub use scheduler::{RefreshMachine, RefreshScheduler, SchedulerAction, SchedulerEvent, SchedulerState, Trigger};
pub use token_store::TokenStore;

/// Fully wired session client: transport, orchestrator and background tasks.
pub struct SessionClient {
    manager: Arc<SessionManager>,
    admin: AdminApi,
    scheduler: RefreshScheduler,
    monitor: Option<ActivityMonitor>,
}

impl SessionClient {
    /// Wire everything from configuration. Must be called inside a tokio runtime.
    pub fn start(config: &ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self, SessionError> {
        let tokens = TokenStore::new();
        let graphql = GraphqlClient::new(config, tokens.clone())?;
        let backend = Arc::new(GraphqlSessionApi::new(graphql.clone(), config.request_timeout));
        let manager = Arc::new(SessionManager::new(backend, tokens, navigator));

        let scheduler = RefreshScheduler::spawn(manager.clone(), config.scheduler());
        let monitor = config
            .idle_timeout
            .map(|idle| ActivityMonitor::spawn(manager.clone(), idle));

        tracing::info!(endpoint = %config.graphql_url, env = %config.env, "session client started");

        Ok(Self {
            manager,
            admin: AdminApi::new(graphql),
            scheduler,
            monitor,
        })
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    pub fn admin(&self) -> &AdminApi {
        &self.admin
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Forward a window-focus / visibility signal to the refresh scheduler.
    pub fn notify(&self, trigger: Trigger) {
        self.scheduler.trigger(trigger);
    }

    /// Record user activity for the idle monitor (no-op when disabled).
    pub fn record_activity(&self) {
        if let Some(monitor) = &self.monitor {
            monitor.record_activity();
        }
    }

    /// Stop background tasks. Local session state is left as is.
    pub fn shutdown(self) {
        self.scheduler.shutdown();
        if let Some(monitor) = self.monitor {
            monitor.shutdown();
        }
    }
}
