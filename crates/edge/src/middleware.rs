use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use careerhub_auth::{EdgeDecision, RouteClassifier, SESSION_EVIDENCE_COOKIE};

#[derive(Clone, Default)]
pub struct EdgeState {
    pub classifier: Arc<RouteClassifier>,
}

/// Apply the route classifier to every non-static, non-API request.
///
/// Only asks whether a session could exist (refresh cookie present); the
/// cookie's value is never read.
pub async fn edge_filter(
    State(state): State<EdgeState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if !RouteClassifier::is_filtered(&path) {
        return next.run(req).await;
    }

    let evidence = has_session_evidence(req.headers());
    match state.classifier.decide(&path, evidence) {
        EdgeDecision::Allow => next.run(req).await,
        EdgeDecision::Redirect(route) => {
            tracing::debug!(%path, to = %route, evidence, "edge redirect");
            Redirect::to(route.path()).into_response()
        }
    }
}

/// Whether any `Cookie` header carries a non-empty session-evidence cookie.
pub fn has_session_evidence(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .any(|(name, value)| name.trim() == SESSION_EVIDENCE_COOKIE && !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for c in cookies {
            map.append(header::COOKIE, HeaderValue::from_str(c).unwrap());
        }
        map
    }

    #[test]
    fn finds_evidence_among_other_cookies() {
        assert!(has_session_evidence(&headers(&["theme=dark; refresh_token=abc; user-role=admin"])));
        assert!(has_session_evidence(&headers(&["theme=dark", "refresh_token=abc"])));
    }

    #[test]
    fn role_cookie_alone_is_not_evidence() {
        assert!(!has_session_evidence(&headers(&["user-role=super_admin"])));
        assert!(!has_session_evidence(&headers(&[])));
    }

    #[test]
    fn empty_or_lookalike_cookie_is_not_evidence() {
        assert!(!has_session_evidence(&headers(&["refresh_token="])));
        assert!(!has_session_evidence(&headers(&["old_refresh_token=abc"])));
    }
}
