//! Inactivity detection
//!
//! User interaction is reported to an [`ActivityHub`]. An [`IdleTimer`]
//! listens on the hub and invokes its callback once the hub has been quiet
//! for the configured duration. The timer knows nothing about sessions; the
//! caller decides what the callback does.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

/// Interaction events that count as activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    MouseDown,
    MouseMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
    Wheel,
}

impl ActivityKind {
    pub const ALL: [Self; 7] = [
        Self::MouseDown,
        Self::MouseMove,
        Self::KeyPress,
        Self::Scroll,
        Self::TouchStart,
        Self::Click,
        Self::Wheel,
    ];
}

/// Handle returned by [`ActivityHub::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(ActivityKind) + Send + Sync>;

/// Fan-out point for user interaction events
#[derive(Clone, Default)]
pub struct ActivityHub {
    next_id: Arc<AtomicU64>,
    listeners: Arc<Mutex<BTreeMap<ListenerId, (ActivityKind, Listener)>>>,
}

impl std::fmt::Debug for ActivityHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ActivityHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(
        &self,
        kind: ActivityKind,
        listener: impl Fn(ActivityKind) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, (kind, Arc::new(listener)));
        id
    }

    /// Returns whether the listener was registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Report an interaction to every listener registered for `kind`
    pub fn record(&self, kind: ActivityKind) {
        let matching: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, listener)| listener.clone())
            .collect();

        // Listeners run outside the lock so they may add or remove listeners
        for listener in matching {
            listener(kind);
        }
    }
}

type Callback = Arc<dyn Fn() + Send + Sync>;

struct Running {
    listeners: Vec<ListenerId>,
    reset: Arc<Notify>,
    callback: Arc<Mutex<Callback>>,
    task: JoinHandle<()>,
}

/// Invokes a callback after a period without activity
///
/// Two states: stopped and running. Elapsing does not stop the timer; the
/// callback fires once per idle period and the countdown re-arms on the next
/// activity.
pub struct IdleTimer {
    timeout: Duration,
    hub: ActivityHub,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for IdleTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleTimer")
            .field("timeout", &self.timeout)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl IdleTimer {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

    pub const fn new(hub: ActivityHub, timeout: Duration) -> Self {
        Self {
            timeout,
            hub,
            running: Mutex::new(None),
        }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Start watching for inactivity
    ///
    /// Calling this while running swaps in the new callback and restarts the
    /// countdown; listeners are registered only once. Must be called from
    /// within a Tokio runtime.
    pub fn start(&self, on_timeout: impl Fn() + Send + Sync + 'static) {
        let callback: Callback = Arc::new(on_timeout);
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(current) = running.as_ref() {
            *current
                .callback
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = callback;
            current.reset.notify_one();
            debug!("Idle timer restarted");
            return;
        }

        let reset = Arc::new(Notify::new());
        let listeners = ActivityKind::ALL
            .into_iter()
            .map(|kind| {
                let reset = reset.clone();
                self.hub.add_listener(kind, move |_| reset.notify_one())
            })
            .collect();

        let callback = Arc::new(Mutex::new(callback));
        let task = tokio::spawn(countdown(self.timeout, reset.clone(), callback.clone()));

        *running = Some(Running {
            listeners,
            reset,
            callback,
            task,
        });
        debug!(timeout_secs = self.timeout.as_secs(), "Idle timer started");
    }

    /// Push the deadline back as if activity had been observed
    pub fn reset(&self) {
        if let Some(current) = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            current.reset.notify_one();
        }
    }

    /// Stop watching and cancel the countdown; a no-op when stopped
    pub fn stop(&self) {
        let Some(running) = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };

        for id in running.listeners {
            self.hub.remove_listener(id);
        }
        running.task.abort();
        debug!("Idle timer stopped");
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn countdown(timeout: Duration, reset: Arc<Notify>, callback: Arc<Mutex<Callback>>) {
    loop {
        tokio::select! {
            () = tokio::time::sleep(timeout) => {
                let on_timeout = callback
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                debug!("Idle timeout elapsed");
                on_timeout();
                // Quiet until the next activity starts a new idle period
                reset.notified().await;
            }
            () = reset.notified() => {}
        }
    }
}
