//! Redirect sink for decisions taken by the session layer.

use tokio::sync::mpsc;

use careerhub_auth::AppRoute;

/// Whatever hosts the views (router, window, test harness) and can move the
/// user to another route.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, route: AppRoute);
}

impl<F> Navigator for F
where
    F: Fn(AppRoute) + Send + Sync + 'static,
{
    fn navigate(&self, route: AppRoute) {
        self(route)
    }
}

/// Navigator that forwards routes to a channel drained by the UI loop.
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<AppRoute>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AppRoute>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: AppRoute) {
        if self.tx.send(route).is_err() {
            tracing::warn!(%route, "navigation dropped; receiver gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_navigator_forwards_in_order() {
        let (nav, mut rx) = ChannelNavigator::new();
        nav.navigate(AppRoute::SignIn);
        nav.navigate(AppRoute::Onboarding);
        assert_eq!(rx.try_recv().unwrap(), AppRoute::SignIn);
        assert_eq!(rx.try_recv().unwrap(), AppRoute::Onboarding);
    }
}
