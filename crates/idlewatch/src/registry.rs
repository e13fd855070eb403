//! The timer registry: tracks the live watchdog for every session.
//!
//! This is the bookkeeping heart of the scheduling contract. It guarantees
//! the central invariant: **at most one live watchdog per session**, with
//! replacement and cancellation folded into single operations so no call
//! path can observe a half-replaced state.
//!
//! # Concurrency note
//!
//! `TimerRegistry` is NOT thread-safe by itself — it uses a plain
//! `HashMap`, not a concurrent one. This is intentional: the registry is
//! owned by the dispatcher task and every mutation happens there, even
//! when the *decision* to cancel originated on a worker task (that
//! decision re-enters the dispatcher through its event channel first).
//! Keeping it single-owner avoids hidden locking overhead.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use idlewatch_types::SessionId;
use tokio::task::AbortHandle;
use tracing::debug;

/// Counter for generating unique timer generation ids.
static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one spawned watchdog task.
///
/// Every signal a watchdog emits carries its `TimerId`; the dispatcher
/// compares it against the registered handle and drops anything stale.
/// A replaced or cancelled watchdog can therefore never act on a session,
/// even if one of its signals was already in flight when it was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Allocates the next generation id.
    pub(crate) fn next() -> Self {
        Self(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

/// A cancelable reference to one running watchdog task.
pub struct TimerHandle {
    id: TimerId,
    task: AbortHandle,
}

impl TimerHandle {
    pub(crate) fn new(id: TimerId, task: AbortHandle) -> Self {
        Self { id, task }
    }

    /// The generation id of the watchdog behind this handle.
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Aborts the watchdog task. Safe to call any number of times, and
    /// safe while a firing is in flight — the firing's eventual signal
    /// fails the dispatcher's generation check and is dropped.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

/// Maps each session to its currently scheduled watchdog.
///
/// ## Contract
///
/// - [`register`](Self::register) stores a handle, cancelling and
///   replacing any prior handle for the same session in one step.
/// - [`cancel`](Self::cancel) cancels and removes if present; unknown
///   sessions are a no-op. Cancel-after-cancel and cancel-after-replace
///   are always safe.
/// - Nothing here ever errors: double registration and unknown-session
///   operations are normal races in session lifecycles, not faults.
pub struct TimerRegistry {
    timers: HashMap<SessionId, TimerHandle>,
}

impl TimerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            timers: HashMap::new(),
        }
    }

    /// Stores `handle` for `session`, cancelling any previous handle.
    pub fn register(&mut self, session: SessionId, handle: TimerHandle) {
        let timer = handle.id();
        if let Some(prev) = self.timers.insert(session, handle) {
            prev.cancel();
            debug!(%session, old = %prev.id(), new = %timer, "watchdog replaced");
        } else {
            debug!(%session, %timer, "watchdog registered");
        }
    }

    /// Cancels and removes the session's handle if one exists.
    pub fn cancel(&mut self, session: SessionId) {
        if let Some(handle) = self.timers.remove(&session) {
            handle.cancel();
            debug!(%session, timer = %handle.id(), "watchdog cancelled");
        }
    }

    /// Looks up the session's current handle.
    pub fn get(&self, session: SessionId) -> Option<&TimerHandle> {
        self.timers.get(&session)
    }

    /// Cancels every registered handle and empties the registry.
    pub fn clear(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.cancel();
        }
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Returns `true` if no handles are registered.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for `TimerRegistry`.
    //!
    //! Handles wrap real Tokio abort handles, so these run under a
    //! runtime. The spawned tasks just sleep forever; whether a task was
    //! cancelled is observed through `AbortHandle` + `is_finished` after
    //! yielding to let the abort land.

    use std::time::Duration;

    use tokio::task::JoinHandle;

    use super::*;

    fn sid(id: u64) -> SessionId {
        SessionId(id)
    }

    /// Spawns a sleep-forever task and returns both the registry handle
    /// and the join handle (to observe whether it was aborted).
    fn dummy_timer() -> (TimerHandle, JoinHandle<()>) {
        let join = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let handle = TimerHandle::new(TimerId::next(), join.abort_handle());
        (handle, join)
    }

    async fn assert_aborted(join: JoinHandle<()>) {
        // The abort is asynchronous; awaiting the join handle observes it.
        let result = join.await;
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_register_new_session_stores_handle() {
        let mut registry = TimerRegistry::new();
        let (handle, _join) = dummy_timer();
        let timer = handle.id();

        registry.register(sid(1), handle);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(sid(1)).map(TimerHandle::id), Some(timer));
    }

    #[tokio::test]
    async fn test_register_replaces_and_cancels_previous() {
        let mut registry = TimerRegistry::new();
        let (old, old_join) = dummy_timer();
        let (new, _new_join) = dummy_timer();
        let new_id = new.id();

        registry.register(sid(1), old);
        registry.register(sid(1), new);

        // Still exactly one handle, and it's the new one.
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(sid(1)).map(TimerHandle::id), Some(new_id));
        assert_aborted(old_join).await;
    }

    #[tokio::test]
    async fn test_cancel_aborts_and_removes() {
        let mut registry = TimerRegistry::new();
        let (handle, join) = dummy_timer();
        registry.register(sid(1), handle);

        registry.cancel(sid(1));

        assert!(registry.is_empty());
        assert!(registry.get(sid(1)).is_none());
        assert_aborted(join).await;
    }

    #[tokio::test]
    async fn test_cancel_unknown_session_is_noop() {
        let mut registry = TimerRegistry::new();

        // Must not panic or create an entry.
        registry.cancel(sid(99));

        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_twice_is_safe() {
        let mut registry = TimerRegistry::new();
        let (handle, join) = dummy_timer();
        registry.register(sid(1), handle);

        registry.cancel(sid(1));
        registry.cancel(sid(1));

        assert!(registry.is_empty());
        assert_aborted(join).await;
    }

    #[tokio::test]
    async fn test_cancel_after_replace_only_touches_current() {
        // cancel() after a replace must cancel the replacement, and the
        // already-cancelled original must not resurface.
        let mut registry = TimerRegistry::new();
        let (old, old_join) = dummy_timer();
        let (new, new_join) = dummy_timer();
        registry.register(sid(1), old);
        registry.register(sid(1), new);

        registry.cancel(sid(1));

        assert!(registry.is_empty());
        assert_aborted(old_join).await;
        assert_aborted(new_join).await;
    }

    #[tokio::test]
    async fn test_clear_cancels_everything() {
        let mut registry = TimerRegistry::new();
        let (h1, j1) = dummy_timer();
        let (h2, j2) = dummy_timer();
        registry.register(sid(1), h1);
        registry.register(sid(2), h2);

        registry.clear();

        assert!(registry.is_empty());
        assert_aborted(j1).await;
        assert_aborted(j2).await;
    }

    #[tokio::test]
    async fn test_timer_ids_are_unique() {
        let (a, _ja) = dummy_timer();
        let (b, _jb) = dummy_timer();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_handle_cancel_is_idempotent() {
        let (handle, join) = dummy_timer();
        handle.cancel();
        handle.cancel();
        assert_aborted(join).await;
    }
}
