//! GraphQL transport with the outgoing-request decorator.

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::config::{AppEnv, ClientConfig, DEV_ENV_HEADER};
use crate::error::SessionError;
use crate::token_store::TokenStore;

/// Failure of a single GraphQL exchange, before operation-specific mapping.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphqlError {
    /// DNS, connect, timeout, or a non-2xx reply without a GraphQL body.
    #[error("transport error: {0}")]
    Transport(String),

    /// A well-formed reply carrying `errors`.
    #[error("{0}")]
    Application(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl GraphqlError {
    /// Map to a session error; application failures take the operation's own kind.
    pub fn into_session_error(self, application: fn(String) -> SessionError) -> SessionError {
        match self {
            GraphqlError::Transport(msg) => SessionError::Network(msg),
            GraphqlError::Application(msg) => application(msg),
            GraphqlError::Decode(msg) => SessionError::Decode(msg),
        }
    }
}

#[derive(Debug, Serialize)]
struct Request<'a, V> {
    query: &'a str,
    #[serde(rename = "operationName")]
    operation_name: &'a str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<ErrorItem>>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    message: String,
}

/// Client for the single GraphQL endpoint.
///
/// Cheap to clone; clones share the connection pool, the cookie jar (which
/// carries the server-set refresh credential) and the token store.
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: TokenStore,
    env: AppEnv,
}

impl GraphqlClient {
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SessionError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.graphql_url.clone(),
            tokens,
            env: config.env,
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Attach the current credential (and dev-only headers) to a request.
    fn decorate(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = match self.tokens.get() {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        match self.env {
            AppEnv::Development => req.header(DEV_ENV_HEADER, self.env.as_str()),
            AppEnv::Production => req,
        }
    }

    /// Execute an operation and decode its `data` into `T`.
    pub async fn execute<V, T>(&self, operation: &str, query: &str, variables: V) -> Result<T, GraphqlError>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let body = Request {
            query,
            operation_name: operation,
            variables,
        };

        let resp = self
            .decorate(self.http.post(&self.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| GraphqlError::Transport(e.to_string()))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| GraphqlError::Transport(e.to_string()))?;

        let envelope: Envelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => return Err(GraphqlError::Decode(e.to_string())),
            Err(_) => return Err(GraphqlError::Transport(format!("HTTP {status}"))),
        };

        if let Some(errors) = envelope.errors.filter(|errs| !errs.is_empty()) {
            let message = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            tracing::debug!(operation, %message, "graphql application error");
            return Err(GraphqlError::Application(message));
        }

        if !status.is_success() {
            return Err(GraphqlError::Transport(format!("HTTP {status}")));
        }

        let data = envelope
            .data
            .ok_or_else(|| GraphqlError::Decode(format!("{operation}: response has no data")))?;

        serde_json::from_value(data).map_err(|e| GraphqlError::Decode(format!("{operation}: {e}")))
    }
}
