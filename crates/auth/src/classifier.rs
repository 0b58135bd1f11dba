//! Edge-level route classification.
//!
//! Runs before any page code, using only coarse session evidence: "could this
//! possibly be a signed-in user". Whether the user is *allowed* on a page is the
//! role guard's job.

use crate::AppRoute;

/// Name of the cookie whose presence is the only session evidence available at
/// the edge. Its value is script-inaccessible and never inspected.
pub const SESSION_EVIDENCE_COOKIE: &str = "refresh_token";

/// Pages reachable without a session.
pub const PUBLIC_PREFIXES: &[&str] = &[
    "/",
    "/about",
    "/pricing",
    "/contact",
    "/blog",
    "/careers",
    "/mentors",
    "/privacy",
    "/terms",
    "/signin",
    "/signup",
    "/verify",
    "/forgot-password",
    "/reset-password",
    "/unauthorized",
];

/// Pages that need at least session evidence to be worth rendering.
pub const PROTECTED_PREFIXES: &[&str] = &[
    "/dashboard",
    "/super-admin",
    "/onboarding",
    "/profile",
    "/settings",
    "/learning",
    "/mentorship",
    "/messages",
];

/// Sign-in/sign-up pages; a user with session evidence is bounced home.
pub const AUTH_PAGES: &[&str] = &["/signin", "/signup"];

/// Path prefixes the edge filter never intercepts.
const BYPASS_PREFIXES: &[&str] = &["/api", "/_next", "/static"];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Protected,
    Unclassified,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EdgeDecision {
    Allow,
    Redirect(AppRoute),
}

/// Static public/protected tables, loaded once and consulted per navigation.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    public: &'static [&'static str],
    protected: &'static [&'static str],
    auth_pages: &'static [&'static str],
}

impl Default for RouteClassifier {
    fn default() -> Self {
        Self::new(PUBLIC_PREFIXES, PROTECTED_PREFIXES, AUTH_PAGES)
    }
}

impl RouteClassifier {
    pub fn new(
        public: &'static [&'static str],
        protected: &'static [&'static str],
        auth_pages: &'static [&'static str],
    ) -> Self {
        Self {
            public,
            protected,
            auth_pages,
        }
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        if matches_any(self.public, path) {
            RouteClass::Public
        } else if matches_any(self.protected, path) {
            RouteClass::Protected
        } else {
            RouteClass::Unclassified
        }
    }

    pub fn is_auth_page(&self, path: &str) -> bool {
        matches_any(self.auth_pages, path)
    }

    /// Apply the edge decision table.
    pub fn decide(&self, path: &str, has_session_evidence: bool) -> EdgeDecision {
        if has_session_evidence && self.is_auth_page(path) {
            return EdgeDecision::Redirect(AppRoute::Home);
        }

        match self.classify(path) {
            RouteClass::Public => EdgeDecision::Allow,
            RouteClass::Protected if !has_session_evidence => EdgeDecision::Redirect(AppRoute::SignIn),
            // Fine-grained check happens in the page.
            RouteClass::Protected | RouteClass::Unclassified => EdgeDecision::Allow,
        }
    }

    /// Whether the edge filter should look at this path at all.
    ///
    /// API routes, framework/static assets and anything that looks like a file
    /// pass straight through.
    pub fn is_filtered(path: &str) -> bool {
        if matches_any(BYPASS_PREFIXES, path) {
            return false;
        }
        let last = path.rsplit('/').next().unwrap_or_default();
        !last.contains('.')
    }
}

/// `/` matches only itself; any other prefix matches itself or a sub-path.
fn matches_prefix(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return path == "/";
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn matches_any(prefixes: &[&str], path: &str) -> bool {
    prefixes.iter().any(|p| matches_prefix(p, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_without_evidence_goes_to_signin() {
        let c = RouteClassifier::default();
        assert_eq!(c.decide("/dashboard", false), EdgeDecision::Redirect(AppRoute::SignIn));
        assert_eq!(c.decide("/dashboard", true), EdgeDecision::Allow);
    }

    #[test]
    fn signin_with_evidence_goes_home() {
        let c = RouteClassifier::default();
        assert_eq!(c.decide("/signin", true), EdgeDecision::Redirect(AppRoute::Home));
        assert_eq!(c.decide("/signup", true), EdgeDecision::Redirect(AppRoute::Home));
        assert_eq!(c.decide("/signin", false), EdgeDecision::Allow);
    }

    #[test]
    fn root_matches_only_exactly() {
        let c = RouteClassifier::default();
        assert_eq!(c.classify("/"), RouteClass::Public);
        assert_eq!(c.classify("/nowhere"), RouteClass::Unclassified);
        assert_eq!(c.decide("/nowhere", false), EdgeDecision::Allow);
    }

    #[test]
    fn prefixes_match_on_segment_boundaries() {
        let c = RouteClassifier::default();
        assert_eq!(c.classify("/dashboard/courses/42"), RouteClass::Protected);
        assert_eq!(c.classify("/dashboard/"), RouteClass::Protected);
        assert_eq!(c.classify("/dashboards"), RouteClass::Unclassified);
        assert_eq!(c.classify("/about/team"), RouteClass::Public);
        assert_eq!(c.decide("/super-admin/users", false), EdgeDecision::Redirect(AppRoute::SignIn));
    }

    #[test]
    fn static_and_api_paths_bypass_the_filter() {
        assert!(!RouteClassifier::is_filtered("/api/graphql"));
        assert!(!RouteClassifier::is_filtered("/_next/static/chunk.js"));
        assert!(!RouteClassifier::is_filtered("/favicon.ico"));
        assert!(!RouteClassifier::is_filtered("/static/logo"));
        assert!(RouteClassifier::is_filtered("/dashboard"));
        assert!(RouteClassifier::is_filtered("/"));
        assert!(RouteClassifier::is_filtered("/apis"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: with session evidence present, the edge never sends
            /// anyone to sign-in; it only ever defers or bounces auth pages home.
            #[test]
            fn evidence_never_redirects_to_signin(path in "(/[a-z0-9-]{0,12}){1,4}") {
                let c = RouteClassifier::default();
                prop_assert_ne!(c.decide(&path, true), EdgeDecision::Redirect(AppRoute::SignIn));
            }

            /// Property: every sub-path of a protected prefix is protected.
            #[test]
            fn protected_subpaths_require_evidence(
                idx in 0usize..PROTECTED_PREFIXES.len(),
                tail in "(/[a-z0-9-]{1,12}){0,3}"
            ) {
                let c = RouteClassifier::default();
                let path = format!("{}{}", PROTECTED_PREFIXES[idx], tail);
                prop_assert_eq!(c.decide(&path, false), EdgeDecision::Redirect(AppRoute::SignIn));
                prop_assert_eq!(c.decide(&path, true), EdgeDecision::Allow);
            }
        }
    }
}
