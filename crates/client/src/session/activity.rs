//! User activity tracking.
//!
//! Front ends report raw input events; the monitor coalesces bursts into at
//! most one `last_activity` update per window.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::AuthManager;

/// Minimum interval between two activity updates.
pub const ACTIVITY_WINDOW: Duration = Duration::from_secs(30);

/// Events queued before new ones are dropped.
const EVENT_BUFFER: usize = 64;

/// Kind of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Pointer,
    Keyboard,
    Scroll,
    Touch,
}

/// Leading-edge debouncer: the first event fires, then nothing until the
/// window has elapsed.
#[derive(Debug, Clone)]
pub struct ActivityDebouncer {
    window: Duration,
    last_fired: Option<Instant>,
}

impl ActivityDebouncer {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: None,
        }
    }

    /// Whether an event at `now` should produce an update.
    pub fn should_fire(&mut self, now: Instant) -> bool {
        let due = self
            .last_fired
            .is_none_or(|last| now.saturating_duration_since(last) >= self.window);
        if due {
            self.last_fired = Some(now);
        }
        due
    }
}

/// Background task turning input events into activity updates.
#[derive(Debug)]
pub struct ActivityMonitor {
    events: mpsc::Sender<ActivityKind>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ActivityMonitor {
    /// Start monitoring with the default 30-second window.
    #[must_use]
    pub fn spawn(auth: AuthManager) -> Self {
        Self::spawn_with_window(auth, ACTIVITY_WINDOW)
    }

    /// Start monitoring with a custom window.
    #[must_use]
    pub fn spawn_with_window(auth: AuthManager, window: Duration) -> Self {
        let (events, mut rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let stop = cancel.clone();

        let task = tokio::spawn(async move {
            let mut debouncer = ActivityDebouncer::new(window);
            loop {
                tokio::select! {
                    () = stop.cancelled() => break,
                    event = rx.recv() => {
                        let Some(kind) = event else { break };
                        if auth.is_authenticated().await && debouncer.should_fire(Instant::now()) {
                            tracing::trace!(?kind, "Recording user activity");
                            auth.update_activity().await;
                        }
                    }
                }
            }
        });

        Self {
            events,
            cancel,
            task,
        }
    }

    /// Report an input event. Never blocks; events are dropped when the
    /// queue is full.
    pub fn notify(&self, kind: ActivityKind) {
        let _ = self.events.try_send(kind);
    }

    /// Stop the monitor and wait for its task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Activity monitor task failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kisan_setu_core::{User, UserId};

    use super::*;
    use crate::session::LoginOptions;
    use crate::store::Store;

    async fn signed_in() -> AuthManager {
        let auth = AuthManager::new(Store::in_memory());
        auth.login(User::new(UserId::from(2), "farmer1"), LoginOptions::default())
            .await;
        forget_activity(&auth).await;
        auth
    }

    async fn forget_activity(auth: &AuthManager) {
        let mut state = auth.inner.state.write().await;
        state.user.as_mut().unwrap().last_activity = None;
    }

    async fn recorded(auth: &AuthManager) -> bool {
        auth.current_user().await.unwrap().last_activity.is_some()
    }

    /// Lets the monitor task drain its queue.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_records_once_per_window() {
        let auth = signed_in().await;
        let monitor = ActivityMonitor::spawn(auth.clone());

        for _ in 0..10 {
            monitor.notify(ActivityKind::Pointer);
        }
        settle().await;
        assert!(recorded(&auth).await);

        forget_activity(&auth).await;
        monitor.notify(ActivityKind::Keyboard);
        settle().await;
        assert!(!recorded(&auth).await);

        tokio::time::advance(ACTIVITY_WINDOW).await;
        monitor.notify(ActivityKind::Scroll);
        settle().await;
        assert!(recorded(&auth).await);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_ignores_signed_out_input() {
        let auth = AuthManager::new(Store::in_memory());
        let monitor = ActivityMonitor::spawn(auth.clone());

        monitor.notify(ActivityKind::Touch);
        settle().await;
        assert!(auth.current_user().await.is_none());

        // The window only opens on a recorded update
        auth.login(User::new(UserId::from(2), "farmer1"), LoginOptions::default())
            .await;
        forget_activity(&auth).await;
        monitor.notify(ActivityKind::Touch);
        settle().await;
        assert!(recorded(&auth).await);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_recording() {
        let auth = signed_in().await;
        let monitor = ActivityMonitor::spawn(auth.clone());
        let events = monitor.events.clone();

        monitor.shutdown().await;
        let _ = events.try_send(ActivityKind::Pointer);
        settle().await;
        assert!(!recorded(&auth).await);
    }

    #[test]
    fn test_debouncer_coalesces_bursts() {
        let start = Instant::now();
        let mut debouncer = ActivityDebouncer::new(ACTIVITY_WINDOW);

        assert!(debouncer.should_fire(start));
        assert!(!debouncer.should_fire(start + Duration::from_secs(1)));
        assert!(!debouncer.should_fire(start + Duration::from_secs(29)));
        assert!(debouncer.should_fire(start + Duration::from_secs(30)));
        assert!(!debouncer.should_fire(start + Duration::from_secs(45)));
        assert!(debouncer.should_fire(start + Duration::from_secs(61)));
    }

    #[test]
    fn test_burst_within_window_fires_once() {
        let start = Instant::now();
        let mut debouncer = ActivityDebouncer::new(ACTIVITY_WINDOW);
        let fired = (0..100)
            .filter(|i| debouncer.should_fire(start + Duration::from_millis(i * 100)))
            .count();
        assert_eq!(fired, 1);
    }
}
