//! Router for the edge process.
//!
//! Page rendering lives behind this process; here every page path resolves to
//! the application shell once the filter lets it through.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Json, Router, http::Uri, middleware, routing::get};
use serde_json::json;

use careerhub_auth::RouteClassifier;

use crate::middleware::{EdgeState, edge_filter};

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Edge process configuration.
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    pub addr: SocketAddr,
}

impl EdgeConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let raw = std::env::var("CAREERHUB_EDGE_ADDR").unwrap_or_else(|_| {
            tracing::warn!("CAREERHUB_EDGE_ADDR not set; using {DEFAULT_ADDR}");
            DEFAULT_ADDR.to_string()
        });
        let addr = raw
            .parse()
            .map_err(|e| anyhow::anyhow!("CAREERHUB_EDGE_ADDR '{raw}': {e}"))?;
        Ok(Self { addr })
    }
}

pub fn build_app(classifier: RouteClassifier) -> Router {
    let state = EdgeState {
        classifier: Arc::new(classifier),
    };

    Router::new()
        .route("/api/health", get(health))
        .fallback(shell)
        .layer(middleware::from_fn_with_state(state, edge_filter))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn shell(uri: Uri) -> Json<serde_json::Value> {
    Json(json!({ "render": uri.path() }))
}
