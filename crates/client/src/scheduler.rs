//! Background access-token refresh.
//!
//! Timer ticks, window focus and visibility changes all converge on one driver
//! task. The driver owns the only "busy" state, so overlapping triggers can
//! never start a second refresh while one is in flight: they are dropped, not
//! queued.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Notify, mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use careerhub_auth::AuthStatus;

use crate::config::SchedulerConfig;
use crate::error::SessionError;
use crate::manager::{EndReason, SessionManager};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled,
    Refreshing,
}

/// Something that asks for a refresh.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Trigger {
    Timer,
    /// Window regained focus.
    FocusRegained,
    /// Page became visible again (device woke, tab foregrounded).
    VisibilityVisible,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// The live session was republished (e.g. with a refreshed token).
    Authenticated,
    /// A different session became live, even if the sign-out before it was
    /// never observed.
    SessionReplaced,
    Unauthenticated,
    Trigger(Trigger),
    RefreshSucceeded,
    RefreshFailed,
}

/// Side effect the driver must perform after a transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchedulerAction {
    None,
    /// Arm a fresh timer, abandoning any refresh still in flight.
    ArmTimer,
    StartRefresh,
    /// Cancel timer and any in-flight refresh.
    Disarm,
    /// Disarm, then force a logout.
    DisarmAndLogout,
}

/// Pure transition function of the refresh scheduler.
#[derive(Debug, Clone)]
pub struct RefreshMachine {
    state: SchedulerState,
}

impl Default for RefreshMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshMachine {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn handle(&mut self, event: SchedulerEvent) -> SchedulerAction {
        use SchedulerAction as A;
        use SchedulerEvent as E;
        use SchedulerState as S;

        let (next, action) = match (self.state, event) {
            // Whatever was in flight belonged to the old session.
            (_, E::SessionReplaced) => (S::Scheduled, A::ArmTimer),

            (S::Idle, E::Authenticated) => (S::Scheduled, A::ArmTimer),
            // Nothing to refresh; stale completions and triggers are ignored.
            (S::Idle, _) => (S::Idle, A::None),

            (S::Scheduled, E::Trigger(_)) => (S::Refreshing, A::StartRefresh),
            (S::Scheduled, E::Unauthenticated) => (S::Idle, A::Disarm),
            (S::Scheduled, E::Authenticated | E::RefreshSucceeded | E::RefreshFailed) => (S::Scheduled, A::None),

            // Busy: drop, don't defer.
            (S::Refreshing, E::Trigger(_) | E::Authenticated) => (S::Refreshing, A::None),
            (S::Refreshing, E::RefreshSucceeded) => (S::Scheduled, A::None),
            (S::Refreshing, E::RefreshFailed) => (S::Idle, A::DisarmAndLogout),
            (S::Refreshing, E::Unauthenticated) => (S::Idle, A::Disarm),
        };

        if next != self.state {
            tracing::debug!(from = ?self.state, to = ?next, ?event, "refresh scheduler transition");
        } else if let E::Trigger(trigger) = event {
            tracing::debug!(?trigger, state = ?self.state, "refresh trigger dropped");
        }

        self.state = next;
        action
    }
}

type RefreshFuture = Pin<Box<dyn Future<Output = Result<(), SessionError>> + Send>>;

/// Handle to the refresh driver task.
///
/// Dropping the handle stops the task; timers and trigger delivery go with it.
pub struct RefreshScheduler {
    triggers: mpsc::Sender<Trigger>,
    state: watch::Receiver<SchedulerState>,
    shutdown: Arc<Notify>,
    handle: tokio::task::JoinHandle<()>,
}

impl RefreshScheduler {
    /// Spawn the driver. It follows the manager's auth status: armed while
    /// authenticated, idle otherwise.
    pub fn spawn(manager: Arc<SessionManager>, config: SchedulerConfig) -> Self {
        let (trigger_tx, trigger_rx) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let shutdown = Arc::new(Notify::new());

        let handle = tokio::spawn(drive(manager, config, trigger_rx, state_tx, shutdown.clone()));

        Self {
            triggers: trigger_tx,
            state: state_rx,
            shutdown,
            handle,
        }
    }

    /// Ask for a refresh. Never blocks; a full inbox means a refresh is
    /// already pending, so the trigger is dropped.
    pub fn trigger(&self, trigger: Trigger) {
        if self.triggers.try_send(trigger).is_err() {
            tracing::debug!(?trigger, "refresh trigger inbox full; dropped");
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.clone()
    }

    /// Request graceful shutdown of the driver.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn settle(in_flight: &mut Option<RefreshFuture>) -> Result<(), SessionError> {
    match in_flight {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

/// Turn the latest auth status into an event, tracking which session the
/// scheduler is serving. The `watch` coalesces, so a sign-out followed by a
/// sign-in may only show up as a new epoch.
fn observe(
    auth: &mut watch::Receiver<AuthStatus>,
    manager: &SessionManager,
    session_epoch: &mut Option<u64>,
) -> SchedulerEvent {
    let (authenticated, epoch) = {
        // Epoch changes happen under the status lock, so this pair is consistent.
        let status = auth.borrow_and_update();
        (status.is_authenticated(), manager.epoch())
    };

    if !authenticated {
        *session_epoch = None;
        return SchedulerEvent::Unauthenticated;
    }
    let event = match *session_epoch {
        Some(seen) if seen == epoch => SchedulerEvent::Authenticated,
        Some(_) | None => SchedulerEvent::SessionReplaced,
    };
    *session_epoch = Some(epoch);
    event
}

fn arm(config: &SchedulerConfig) -> Interval {
    // First fire one full period from now, not immediately.
    let period = config.refresh_interval;
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

fn start_refresh(manager: &Arc<SessionManager>, config: &SchedulerConfig) -> RefreshFuture {
    let manager = manager.clone();
    let limit = config.refresh_timeout;
    Box::pin(async move {
        match tokio::time::timeout(limit, manager.refresh()).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::RefreshFailed(format!("no response within {limit:?}"))),
        }
    })
}

async fn drive(
    manager: Arc<SessionManager>,
    config: SchedulerConfig,
    mut triggers: mpsc::Receiver<Trigger>,
    state_tx: watch::Sender<SchedulerState>,
    shutdown: Arc<Notify>,
) {
    let mut auth = manager.subscribe();
    let mut machine = RefreshMachine::new();
    let mut timer: Option<Interval> = None;
    let mut in_flight: Option<RefreshFuture> = None;

    tracing::info!(interval = ?config.refresh_interval, "refresh scheduler started");

    let mut session_epoch: Option<u64> = None;
    let mut pending = Some(observe(&mut auth, &manager, &mut session_epoch));

    loop {
        if let Some(event) = pending.take() {
            match machine.handle(event) {
                SchedulerAction::None => {}
                SchedulerAction::ArmTimer => {
                    timer = Some(arm(&config));
                    in_flight = None;
                }
                SchedulerAction::StartRefresh => in_flight = Some(start_refresh(&manager, &config)),
                SchedulerAction::Disarm => {
                    timer = None;
                    in_flight = None;
                }
                SchedulerAction::DisarmAndLogout => {
                    timer = None;
                    in_flight = None;
                    state_tx.send_replace(machine.state());
                    if let Some(epoch) = session_epoch {
                        manager.end_session_of(epoch, EndReason::RefreshFailed);
                    }
                }
            }
            state_tx.send_replace(machine.state());
        }

        pending = tokio::select! {
            _ = shutdown.notified() => {
                tracing::info!("refresh scheduler received shutdown signal");
                break;
            }
            changed = auth.changed() => {
                if changed.is_err() {
                    break;
                }
                Some(observe(&mut auth, &manager, &mut session_epoch))
            }
            _ = tick(&mut timer) => Some(SchedulerEvent::Trigger(Trigger::Timer)),
            Some(trigger) = triggers.recv() => Some(SchedulerEvent::Trigger(trigger)),
            result = settle(&mut in_flight) => {
                in_flight = None;
                match result {
                    Ok(()) => Some(SchedulerEvent::RefreshSucceeded),
                    Err(e) => {
                        tracing::warn!(error = %e, "background refresh failed; ending session");
                        Some(SchedulerEvent::RefreshFailed)
                    }
                }
            }
        };
    }

    state_tx.send_replace(SchedulerState::Idle);
    tracing::info!("refresh scheduler stopped");
}
