/// Redirect targets the session layer can issue.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AppRoute {
    Home,
    SignIn,
    Onboarding,
    Unauthorized,
}

impl AppRoute {
    pub fn path(&self) -> &'static str {
        match self {
            AppRoute::Home => "/",
            AppRoute::SignIn => "/signin",
            AppRoute::Onboarding => "/onboarding",
            AppRoute::Unauthorized => "/unauthorized",
        }
    }
}

impl core::fmt::Display for AppRoute {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.path())
    }
}
