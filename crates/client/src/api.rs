//! Session API: credential exchange against the GraphQL backend.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use careerhub_auth::{AccessToken, Principal, Role, Session};
use careerhub_core::{Email, UserId};

use crate::error::SessionError;
use crate::graphql::GraphqlClient;
use crate::token_store::TokenStore;

/// Result of a successful token refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Lifetime in seconds; absent or zero means unknown.
    pub expires_in: Option<u64>,
}

impl RefreshedToken {
    pub fn into_token(self, now: DateTime<Utc>) -> AccessToken {
        AccessToken::from_expires_in(self.access_token, self.expires_in, now)
    }
}

/// Remote session operations.
///
/// Sign-in and code verification populate the token store on success. A
/// refreshed token is only returned: the session manager stores it if the
/// session it was minted for is still live. Implementations never end a
/// session themselves.
#[async_trait]
pub trait SessionBackend: Send + Sync + 'static {
    async fn sign_in(&self, email: &Email, password: &str, remember_me: bool) -> Result<Session, SessionError>;

    /// Mint a new access token from the cookie-held refresh credential.
    /// Does not touch the token store.
    async fn refresh(&self) -> Result<RefreshedToken, SessionError>;

    /// Best effort: never fails, tolerates a request that does not complete.
    async fn sign_out(&self);

    async fn send_otp(&self, email: &Email) -> Result<(), SessionError>;

    async fn verify_otp(&self, email: &Email, code: &str) -> Result<Session, SessionError>;

    /// Current user for the live access token.
    async fn me(&self) -> Result<Principal, SessionError>;
}

const SIGN_IN: &str = r#"mutation SignIn($email: String!, $password: String!, $rememberMe: Boolean!) {
  signIn(email: $email, password: $password, rememberMe: $rememberMe) {
    success
    message
    accessToken
    expiresIn
    user { id role onboardingCompleted }
  }
}"#;

const REFRESH_TOKEN: &str = r#"mutation RefreshToken {
  refreshToken {
    success
    message
    accessToken
    expiresIn
  }
}"#;

const SIGN_OUT: &str = r#"mutation SignOut {
  signOut { success message }
}"#;

const SEND_OTP: &str = r#"mutation SendOtp($email: String!) {
  sendOtp(email: $email) { success message }
}"#;

const VERIFY_OTP: &str = r#"mutation VerifyOtp($email: String!, $code: String!) {
  verifyOtp(email: $email, code: $code) {
    success
    message
    accessToken
    expiresIn
    user { id role onboardingCompleted }
  }
}"#;

const ME: &str = r#"query Me {
  me { id role onboardingCompleted }
}"#;

const SUSPEND_USER: &str = r#"mutation SuspendUser($userId: ID!, $reason: String) {
  suspendUser(userId: $userId, reason: $reason) { success message }
}"#;

const UPDATE_USER_ROLE: &str = r#"mutation UpdateUserRole($userId: ID!, $role: String!) {
  updateUserRole(userId: $userId, role: $role) {
    success
    message
    user { id role onboardingCompleted }
  }
}"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthPayload {
    success: bool,
    message: Option<String>,
    access_token: Option<String>,
    expires_in: Option<u64>,
    user: Option<Principal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPayload {
    success: bool,
    message: Option<String>,
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    success: bool,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    success: bool,
    message: Option<String>,
    user: Option<Principal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInData {
    sign_in: AuthPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    refresh_token: TokenPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignOutData {
    sign_out: StatusPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendOtpData {
    send_otp: StatusPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyOtpData {
    verify_otp: AuthPayload,
}

#[derive(Debug, Deserialize)]
struct MeData {
    me: Option<Principal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuspendUserData {
    suspend_user: StatusPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserRoleData {
    update_user_role: UserPayload,
}

fn rejection(message: Option<String>, fallback: &str) -> String {
    message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

impl AuthPayload {
    /// Turn an accepted payload into a session and populate the token store.
    fn into_session(
        self,
        tokens: &TokenStore,
        rejected: fn(String) -> SessionError,
    ) -> Result<Session, SessionError> {
        if !self.success {
            return Err(rejected(rejection(self.message, "rejected")));
        }

        let (Some(value), Some(principal)) = (self.access_token, self.user) else {
            return Err(SessionError::Decode("accepted payload without token or user".to_string()));
        };

        let token = AccessToken::from_expires_in(value, self.expires_in, Utc::now());
        tokens.replace(Some(token.clone()));

        Ok(Session { principal, token })
    }
}

/// [`SessionBackend`] over the GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct GraphqlSessionApi {
    client: GraphqlClient,
    sign_out_timeout: Duration,
}

impl GraphqlSessionApi {
    pub fn new(client: GraphqlClient, sign_out_timeout: Duration) -> Self {
        Self {
            client,
            sign_out_timeout,
        }
    }

    pub fn client(&self) -> &GraphqlClient {
        &self.client
    }
}

#[async_trait]
impl SessionBackend for GraphqlSessionApi {
    async fn sign_in(&self, email: &Email, password: &str, remember_me: bool) -> Result<Session, SessionError> {
        let data: SignInData = self
            .client
            .execute(
                "SignIn",
                SIGN_IN,
                json!({ "email": email, "password": password, "rememberMe": remember_me }),
            )
            .await
            .map_err(|e| e.into_session_error(SessionError::InvalidCredentials))?;

        data.sign_in
            .into_session(self.client.tokens(), SessionError::InvalidCredentials)
    }

    async fn refresh(&self) -> Result<RefreshedToken, SessionError> {
        let data: RefreshData = self
            .client
            .execute("RefreshToken", REFRESH_TOKEN, json!({}))
            .await
            .map_err(|e| e.into_session_error(SessionError::RefreshFailed))?;

        let payload = data.refresh_token;
        if !payload.success {
            return Err(SessionError::RefreshFailed(rejection(payload.message, "refresh rejected")));
        }
        let Some(access_token) = payload.access_token else {
            return Err(SessionError::RefreshFailed("accepted refresh without token".to_string()));
        };

        Ok(RefreshedToken {
            access_token,
            expires_in: payload.expires_in,
        })
    }

    async fn sign_out(&self) {
        let call = self
            .client
            .execute::<_, SignOutData>("SignOut", SIGN_OUT, json!({}));

        match tokio::time::timeout(self.sign_out_timeout, call).await {
            Ok(Ok(data)) if data.sign_out.success => tracing::debug!("remote sign-out acknowledged"),
            Ok(Ok(data)) => tracing::warn!(
                message = ?data.sign_out.message,
                "remote sign-out rejected; continuing"
            ),
            Ok(Err(e)) => tracing::warn!(error = %e, "remote sign-out failed; continuing"),
            Err(_) => tracing::warn!("remote sign-out timed out; continuing"),
        }
    }

    async fn send_otp(&self, email: &Email) -> Result<(), SessionError> {
        let data: SendOtpData = self
            .client
            .execute("SendOtp", SEND_OTP, json!({ "email": email }))
            .await
            .map_err(|e| e.into_session_error(SessionError::Api))?;

        if data.send_otp.success {
            Ok(())
        } else {
            Err(SessionError::Api(rejection(data.send_otp.message, "could not send code")))
        }
    }

    async fn verify_otp(&self, email: &Email, code: &str) -> Result<Session, SessionError> {
        let data: VerifyOtpData = self
            .client
            .execute("VerifyOtp", VERIFY_OTP, json!({ "email": email, "code": code }))
            .await
            .map_err(|e| e.into_session_error(SessionError::InvalidOtp))?;

        data.verify_otp
            .into_session(self.client.tokens(), SessionError::InvalidOtp)
    }

    async fn me(&self) -> Result<Principal, SessionError> {
        let data: MeData = self
            .client
            .execute("Me", ME, json!({}))
            .await
            .map_err(|e| e.into_session_error(SessionError::Api))?;

        data.me
            .ok_or_else(|| SessionError::Api("no current user".to_string()))
    }
}

/// Super-admin dashboard operations. Authorised by the bearer token alone.
#[derive(Debug, Clone)]
pub struct AdminApi {
    client: GraphqlClient,
}

impl AdminApi {
    pub fn new(client: GraphqlClient) -> Self {
        Self { client }
    }

    pub async fn suspend_user(&self, user_id: &UserId, reason: Option<&str>) -> Result<(), SessionError> {
        let data: SuspendUserData = self
            .client
            .execute(
                "SuspendUser",
                SUSPEND_USER,
                json!({ "userId": user_id, "reason": reason }),
            )
            .await
            .map_err(|e| e.into_session_error(SessionError::Api))?;

        if !data.suspend_user.success {
            return Err(SessionError::Api(rejection(data.suspend_user.message, "suspend rejected")));
        }
        tracing::info!(%user_id, "user suspended");
        Ok(())
    }

    pub async fn update_user_role(&self, user_id: &UserId, role: Role) -> Result<Principal, SessionError> {
        let data: UpdateUserRoleData = self
            .client
            .execute(
                "UpdateUserRole",
                UPDATE_USER_ROLE,
                json!({ "userId": user_id, "role": role }),
            )
            .await
            .map_err(|e| e.into_session_error(SessionError::Api))?;

        let payload = data.update_user_role;
        if !payload.success {
            return Err(SessionError::Api(rejection(payload.message, "role update rejected")));
        }
        let principal = payload
            .user
            .ok_or_else(|| SessionError::Decode("role update without user".to_string()))?;

        tracing::info!(%user_id, %role, "user role updated");
        Ok(principal)
    }
}
