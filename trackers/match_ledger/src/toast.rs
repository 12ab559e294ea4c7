//! Short-lived notifications about mutation outcomes.
//!
//! Each toast expires a fixed time after it is pushed. Expiry is enforced in
//! two places: a timer task removes the toast, and reads skip anything past its
//! deadline, so a late timer never makes a toast outlive its window.

use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    time::Duration,
};
use tokio::{runtime::Handle, task::AbortHandle, time::Instant};
use tracing::debug;

use crate::types::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToastId(u64);

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    expires_at: Instant,
}

impl Toast {
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

#[derive(Default)]
struct QueueState {
    toasts: Vec<Toast>,
    timers: HashMap<ToastId, AbortHandle>,
}

impl QueueState {
    fn purge_expired(&mut self, now: Instant) {
        let timers = &mut self.timers;
        self.toasts.retain(|toast| {
            let alive = toast.expires_at > now;
            if !alive {
                if let Some(timer) = timers.remove(&toast.id) {
                    timer.abort();
                }
            }
            alive
        });
    }
}

#[derive(Clone)]
pub struct ToastQueue {
    state: Arc<Mutex<QueueState>>,
    next_id: Arc<AtomicU64>,
    ttl: Duration,
}

impl ToastQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            next_id: Arc::new(AtomicU64::new(1)),
            ttl,
        }
    }

    /// Adds a toast and schedules its removal after the queue's ttl.
    pub fn push(&self, message: impl Into<String>, severity: Severity) -> ToastId {
        let id = ToastId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let expires_at = Instant::now() + self.ttl;
        let toast = Toast {
            id,
            message: message.into(),
            severity,
            created_at: Utc::now(),
            expires_at,
        };
        debug!("{} {:?}: {}", id, severity, toast.message);

        let mut state = self.lock();
        state.toasts.push(toast);
        // Without a runtime the read-side deadline check still applies.
        if let Ok(handle) = Handle::try_current() {
            let weak = Arc::downgrade(&self.state);
            let timer = handle.spawn(expire_at(weak, id, expires_at));
            state.timers.insert(id, timer.abort_handle());
        }
        id
    }

    /// Removes a toast now. Unknown or already expired ids are ignored.
    pub fn dismiss(&self, id: ToastId) {
        let mut state = self.lock();
        state.toasts.retain(|toast| toast.id != id);
        if let Some(timer) = state.timers.remove(&id) {
            timer.abort();
        }
    }

    /// Live toasts, oldest first.
    pub fn visible(&self) -> Vec<Toast> {
        let mut state = self.lock();
        state.purge_expired(Instant::now());
        state.toasts.clone()
    }

    pub fn contains(&self, id: ToastId) -> bool {
        self.visible().iter().any(|toast| toast.id == id)
    }

    pub fn pending_timers(&self) -> usize {
        self.lock().timers.len()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn expire_at(state: Weak<Mutex<QueueState>>, id: ToastId, deadline: Instant) {
    tokio::time::sleep_until(deadline).await;
    if let Some(state) = state.upgrade() {
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        state.toasts.retain(|toast| toast.id != id);
        state.timers.remove(&id);
    }
}
