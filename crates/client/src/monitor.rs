//! Idle-activity watchdog.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio::time::Instant;

use crate::manager::{EndReason, SessionManager};

/// Ends an authenticated session after `idle_timeout` without user activity.
///
/// Dropping the handle stops the watchdog and releases its timer.
pub struct ActivityMonitor {
    activity: mpsc::Sender<()>,
    shutdown: Arc<Notify>,
    handle: tokio::task::JoinHandle<()>,
}

impl ActivityMonitor {
    pub fn spawn(manager: Arc<SessionManager>, idle_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(watch_idle(manager, idle_timeout, rx, shutdown.clone()));

        Self {
            activity: tx,
            shutdown,
            handle,
        }
    }

    /// Reset the idle clock. A full inbox already carries a reset.
    pub fn record_activity(&self) {
        let _ = self.activity.try_send(());
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

impl Drop for ActivityMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn watch_idle(
    manager: Arc<SessionManager>,
    idle_timeout: Duration,
    mut activity: mpsc::Receiver<()>,
    shutdown: Arc<Notify>,
) {
    let mut auth = manager.subscribe();
    tracing::info!(?idle_timeout, "activity monitor started");

    'outer: loop {
        // Idle: wait for a session, discarding activity in the meantime.
        while !auth.borrow_and_update().is_authenticated() {
            tokio::select! {
                _ = shutdown.notified() => break 'outer,
                changed = auth.changed() => {
                    if changed.is_err() {
                        break 'outer;
                    }
                }
                Some(()) = activity.recv() => {}
            }
        }

        let epoch = manager.epoch();
        let deadline = tokio::time::sleep_until(Instant::now() + idle_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = shutdown.notified() => break 'outer,
                _ = &mut deadline => {
                    tracing::info!(?idle_timeout, "no activity; ending session");
                    manager.end_session_of(epoch, EndReason::IdleTimeout);
                    continue 'outer;
                }
                Some(()) = activity.recv() => {
                    deadline.as_mut().reset(Instant::now() + idle_timeout);
                }
                changed = auth.changed() => {
                    if changed.is_err() {
                        break 'outer;
                    }
                    // Signed out, or a different session took over: start over.
                    if !auth.borrow().is_authenticated() || manager.epoch() != epoch {
                        continue 'outer;
                    }
                }
            }
        }
    }

    tracing::info!("activity monitor stopped");
}
