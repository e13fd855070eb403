//! The dispatcher actor: the AFK state machine and its event router.
//!
//! One dispatcher task runs per server process. It exclusively owns all
//! AFK state — the session table and the [`TimerRegistry`] — and performs
//! every engine-visible side effect (messages, display tags, kicks, HUD
//! activation). Everything else in the system talks to it through a
//! single mpsc channel; this is the "dispatch thread" of the design, so
//! no locking exists anywhere in the state machine.
//!
//! Transitions, per event:
//!
//! ```text
//! session-start   → spawn watchdog (fresh), register      → Active
//! session-end     → cancel handle, drop state             → (gone)
//! command-AFK     → replace watchdog (already-afk),
//!                   confirm immediately                   → ConfirmedAfk
//! AFK-confirmed*  → message + tag if not already tagged   → ConfirmedAfk
//! AFK-cancelled*  → clear tag, replace watchdog (fresh)   → Active
//! kick-due*       → disconnect; engine's session-end
//!                   performs the cleanup                  → (kicked)
//! ```
//!
//! Events marked `*` come from watchdog tasks and carry the emitting
//! watchdog's [`TimerId`]. They are honored only when the session is
//! still live **and** the id matches the registered handle — a signal
//! from a replaced or cancelled watchdog, or for a session that ended
//! while the signal was in flight, is dropped where it lands. That check
//! is the stale-result guard the whole concurrency model leans on.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use idlewatch_store::{ExemptionStore, HudPreferenceStore};
use idlewatch_types::{AfkState, PlayerId, SessionId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::AfkConfig;
use crate::error::AfkError;
use crate::registry::{TimerId, TimerRegistry};
use crate::sinks::GameSinks;
use crate::watchdog::spawn_watchdog;

/// Events processed by the dispatcher, in arrival order.
///
/// The first four originate from the engine via [`AfkHandle`]; the
/// watchdog signals originate from worker tasks; `HudChecked` is the
/// re-entry of the session-start preference lookup.
pub(crate) enum DispatchEvent {
    SessionStarted {
        session: SessionId,
        player: PlayerId,
    },
    SessionEnded {
        session: SessionId,
    },
    CommandAfk {
        session: SessionId,
    },
    Activity {
        session: SessionId,
    },

    AfkConfirmed {
        session: SessionId,
        timer: TimerId,
    },
    AfkCancelled {
        session: SessionId,
        timer: TimerId,
    },
    KickDue {
        session: SessionId,
        timer: TimerId,
    },

    HudChecked {
        session: SessionId,
        enabled: bool,
    },

    Inspect {
        session: SessionId,
        reply: oneshot::Sender<Option<SessionSnapshot>>,
    },
    Stats {
        reply: oneshot::Sender<Stats>,
    },
    Shutdown,
}

/// A point-in-time view of one session's AFK bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The session's current state.
    pub state: AfkState,
    /// Whether the visible AFK tag is currently applied.
    pub tag_set: bool,
    /// Generation id of the registered watchdog, if one is registered.
    pub timer: Option<TimerId>,
}

/// Dispatcher-wide counts, mostly for health checks and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Live sessions.
    pub sessions: usize,
    /// Registered watchdog handles.
    pub timers: usize,
}

/// Everything the dispatcher tracks about one live session.
struct SessionEntry {
    player: PlayerId,
    state: AfkState,
    /// Bumped on every activity event; watchdogs snapshot it against
    /// their private baseline.
    activity: Arc<AtomicU64>,
    tag_set: bool,
}

/// Spawns the dispatcher task and returns the engine-facing handle.
///
/// The config is validated first (degenerate values clamped). The stores
/// are shared with every watchdog and lookup task the dispatcher spawns;
/// the sinks are owned by the dispatcher alone.
pub fn spawn_dispatcher<E, H>(
    config: AfkConfig,
    exemptions: Arc<E>,
    hud: Arc<H>,
    sinks: GameSinks,
) -> AfkHandle
where
    E: ExemptionStore,
    H: HudPreferenceStore,
{
    let (events, receiver) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher::new(
        config.validated(),
        exemptions,
        hud,
        sinks,
        events.clone(),
        receiver,
    );
    tokio::spawn(dispatcher.run());
    AfkHandle { events }
}

/// Handle for feeding engine events to the dispatcher.
///
/// Cheap to clone — it's an `mpsc::Sender` wrapper. The sends are
/// synchronous so engine code that cannot await (event hooks, command
/// handlers) can call them directly; ordering is the channel's FIFO.
///
/// Every method returns [`AfkError::Unavailable`] if the dispatcher has
/// shut down.
#[derive(Clone)]
pub struct AfkHandle {
    events: mpsc::UnboundedSender<DispatchEvent>,
}

impl AfkHandle {
    /// Signals that a player's session began.
    ///
    /// Arms the session's first watchdog and kicks off the one-shot HUD
    /// preference lookup.
    pub fn session_started(
        &self,
        session: SessionId,
        player: PlayerId,
    ) -> Result<(), AfkError> {
        self.send(DispatchEvent::SessionStarted { session, player })
    }

    /// Signals that a session ended. Unknown sessions are a no-op.
    pub fn session_ended(&self, session: SessionId) -> Result<(), AfkError> {
        self.send(DispatchEvent::SessionEnded { session })
    }

    /// Signals that the player explicitly requested AFK (e.g. `/afk`).
    ///
    /// Wins over a concurrently firing watchdog: the old watchdog is
    /// replaced before the confirmation is applied, so a stale "not
    /// idle" observation from it can no longer reactivate the session.
    pub fn command_afk(&self, session: SessionId) -> Result<(), AfkError> {
        self.send(DispatchEvent::CommandAfk { session })
    }

    /// Records qualifying activity for the session.
    pub fn activity(&self, session: SessionId) -> Result<(), AfkError> {
        self.send(DispatchEvent::Activity { session })
    }

    /// Returns a snapshot of the session's bookkeeping, or `None` if the
    /// session is not live.
    pub async fn inspect(
        &self,
        session: SessionId,
    ) -> Result<Option<SessionSnapshot>, AfkError> {
        let (reply, rx) = oneshot::channel();
        self.send(DispatchEvent::Inspect { session, reply })?;
        rx.await.map_err(|_| AfkError::Unavailable)
    }

    /// Returns dispatcher-wide counts.
    pub async fn stats(&self) -> Result<Stats, AfkError> {
        let (reply, rx) = oneshot::channel();
        self.send(DispatchEvent::Stats { reply })?;
        rx.await.map_err(|_| AfkError::Unavailable)
    }

    /// Stops the dispatcher, aborting every watchdog.
    pub fn shutdown(&self) -> Result<(), AfkError> {
        self.send(DispatchEvent::Shutdown)
    }

    fn send(&self, event: DispatchEvent) -> Result<(), AfkError> {
        self.events.send(event).map_err(|_| AfkError::Unavailable)
    }
}

struct Dispatcher<E, H> {
    config: AfkConfig,
    exemptions: Arc<E>,
    hud: Arc<H>,
    sinks: GameSinks,
    sessions: HashMap<SessionId, SessionEntry>,
    registry: TimerRegistry,
    /// Cloned into every watchdog and lookup task so their results
    /// re-enter this actor instead of touching state directly.
    events: mpsc::UnboundedSender<DispatchEvent>,
    receiver: mpsc::UnboundedReceiver<DispatchEvent>,
}

impl<E, H> Dispatcher<E, H>
where
    E: ExemptionStore,
    H: HudPreferenceStore,
{
    fn new(
        config: AfkConfig,
        exemptions: Arc<E>,
        hud: Arc<H>,
        sinks: GameSinks,
        events: mpsc::UnboundedSender<DispatchEvent>,
        receiver: mpsc::UnboundedReceiver<DispatchEvent>,
    ) -> Self {
        Self {
            config,
            exemptions,
            hud,
            sinks,
            sessions: HashMap::new(),
            registry: TimerRegistry::new(),
            events,
            receiver,
        }
    }

    async fn run(mut self) {
        info!("afk dispatcher started");

        while let Some(event) = self.receiver.recv().await {
            if matches!(event, DispatchEvent::Shutdown) {
                break;
            }
            self.handle_event(event);
        }

        // Covers both explicit shutdown and all handles being dropped.
        self.registry.clear();
        info!("afk dispatcher stopped");
    }

    fn handle_event(&mut self, event: DispatchEvent) {
        match event {
            DispatchEvent::SessionStarted { session, player } => {
                self.handle_session_started(session, player);
            }
            DispatchEvent::SessionEnded { session } => {
                self.handle_session_ended(session);
            }
            DispatchEvent::CommandAfk { session } => {
                self.handle_command_afk(session);
            }
            DispatchEvent::Activity { session } => {
                self.handle_activity(session);
            }
            DispatchEvent::AfkConfirmed { session, timer } => {
                if self.timer_is_current(session, timer) {
                    self.apply_confirmed(session);
                } else {
                    debug!(%session, %timer, "stale afk-confirmed dropped");
                }
            }
            DispatchEvent::AfkCancelled { session, timer } => {
                if self.timer_is_current(session, timer) {
                    self.handle_cancelled(session);
                } else {
                    debug!(%session, %timer, "stale afk-cancelled dropped");
                }
            }
            DispatchEvent::KickDue { session, timer } => {
                if self.timer_is_current(session, timer) {
                    self.handle_kick_due(session);
                } else {
                    debug!(%session, %timer, "stale kick dropped");
                }
            }
            DispatchEvent::HudChecked { session, enabled } => {
                self.handle_hud_checked(session, enabled);
            }
            DispatchEvent::Inspect { session, reply } => {
                let _ = reply.send(self.snapshot(session));
            }
            DispatchEvent::Stats { reply } => {
                let _ = reply.send(Stats {
                    sessions: self.sessions.len(),
                    timers: self.registry.len(),
                });
            }
            // Consumed by run() before dispatching here.
            DispatchEvent::Shutdown => {}
        }
    }

    fn handle_session_started(&mut self, session: SessionId, player: PlayerId) {
        if self.sessions.contains_key(&session) {
            warn!(%session, "duplicate session-start — replacing");
        }

        let activity = Arc::new(AtomicU64::new(0));
        let handle = spawn_watchdog(
            session,
            player,
            false,
            &self.config,
            Arc::clone(&activity),
            Arc::clone(&self.exemptions),
            self.events.clone(),
        );
        self.registry.register(session, handle);
        self.sessions.insert(
            session,
            SessionEntry {
                player,
                state: AfkState::Active,
                activity,
                tag_set: false,
            },
        );
        info!(%session, %player, "session started, afk watch armed");

        // The HUD preference lookup runs as a free task and re-enters
        // through the event channel. Its completion order relative to a
        // quick session-end is not guaranteed; the HudChecked handler
        // re-checks liveness before touching the sink.
        let hud = Arc::clone(&self.hud);
        let events = self.events.clone();
        tokio::spawn(async move {
            let enabled = match hud.is_enabled(player).await {
                Ok(enabled) => enabled,
                Err(e) => {
                    warn!(
                        %player,
                        error = %e,
                        "hud preference lookup failed — leaving disabled"
                    );
                    false
                }
            };
            let _ = events.send(DispatchEvent::HudChecked { session, enabled });
        });
    }

    fn handle_session_ended(&mut self, session: SessionId) {
        self.registry.cancel(session);
        if self.sessions.remove(&session).is_some() {
            info!(%session, "session ended, afk watch disarmed");
        } else {
            debug!(%session, "session-end for unknown session ignored");
        }
    }

    fn handle_command_afk(&mut self, session: SessionId) {
        let Some(entry) = self.sessions.get(&session) else {
            debug!(%session, "command-afk for unknown session ignored");
            return;
        };
        let player = entry.player;
        let activity = Arc::clone(&entry.activity);

        // Replace the watchdog with one that starts confirmed, so its
        // first idle firing already counts toward the kick countdown.
        // Replacement also invalidates any in-flight firing of the old
        // watchdog before the confirmation below becomes visible.
        self.registry.cancel(session);
        let handle = spawn_watchdog(
            session,
            player,
            true,
            &self.config,
            activity,
            Arc::clone(&self.exemptions),
            self.events.clone(),
        );
        self.registry.register(session, handle);

        // The player asked for it — confirm on the spot rather than
        // waiting a full cycle for the watchdog to notice.
        self.apply_confirmed(session);
    }

    fn handle_activity(&mut self, session: SessionId) {
        if let Some(entry) = self.sessions.get(&session) {
            entry.activity.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// The AFK-confirmed transition: notify and tag once, then hold the
    /// confirmed state. Reached both from watchdog signals and
    /// synchronously from a command-AFK.
    fn apply_confirmed(&mut self, session: SessionId) {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return;
        };
        if !entry.tag_set {
            self.sinks.messages.send(session, &self.config.afk_message);
            self.sinks.tags.set_tag(session, &self.config.tag_text);
            entry.tag_set = true;
            info!(%session, player = %entry.player, "player marked afk");
        }
        entry.state = AfkState::ConfirmedAfk;
    }

    /// The AFK-cancelled transition: clear the tag and re-arm a fresh
    /// watchdog so the next idle stretch is measured from scratch.
    fn handle_cancelled(&mut self, session: SessionId) {
        self.registry.cancel(session);

        let Some(entry) = self.sessions.get_mut(&session) else {
            return;
        };
        if entry.tag_set {
            self.sinks.tags.clear_tag(session);
            entry.tag_set = false;
            info!(%session, player = %entry.player, "afk cancelled");
        }
        entry.state = AfkState::Active;
        let player = entry.player;
        let activity = Arc::clone(&entry.activity);

        let handle = spawn_watchdog(
            session,
            player,
            false,
            &self.config,
            activity,
            Arc::clone(&self.exemptions),
            self.events.clone(),
        );
        self.registry.register(session, handle);
    }

    /// The kick: terminal for the session. The handle stays registered
    /// until the engine's session-end arrives, so the timers == sessions
    /// invariant holds through the kick window.
    fn handle_kick_due(&mut self, session: SessionId) {
        let Some(entry) = self.sessions.get(&session) else {
            return;
        };
        info!(%session, player = %entry.player, "kicking idle player");
        self.sinks.kick.disconnect(session, &self.config.kick_reason);
    }

    fn handle_hud_checked(&mut self, session: SessionId, enabled: bool) {
        if !enabled {
            return;
        }
        if self.sessions.contains_key(&session) {
            self.sinks.hud.enable(session);
            debug!(%session, "hud enabled");
        } else {
            debug!(%session, "hud lookup resolved after session end — dropped");
        }
    }

    /// Watchdog signals are honored only when the session is live and the
    /// signal's generation matches the registered handle.
    fn timer_is_current(&self, session: SessionId, timer: TimerId) -> bool {
        self.sessions.contains_key(&session)
            && self.registry.get(session).map(|h| h.id()) == Some(timer)
    }

    fn snapshot(&self, session: SessionId) -> Option<SessionSnapshot> {
        let entry = self.sessions.get(&session)?;
        Some(SessionSnapshot {
            state: entry.state,
            tag_set: entry.tag_set,
            timer: self.registry.get(session).map(|h| h.id()),
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the stale-signal guard, driving `handle_event`
    //! directly on an unspawned dispatcher. The full event-loop behavior
    //! (timer firings, kicks, HUD) is covered by the integration suite in
    //! `tests/dispatcher.rs`; here we can forge watchdog signals with
    //! arbitrary generation ids, which the public API deliberately makes
    //! impossible.

    use std::sync::mpsc as std_mpsc;

    use idlewatch_store::{MemoryExemptionStore, MemoryHudStore};

    use super::*;
    use crate::sinks::{DisplayTagSink, HudSink, KickSink, MessageSink};

    #[derive(Debug, PartialEq, Eq)]
    enum SinkCall {
        TagSet(SessionId),
        TagCleared(SessionId),
        Message(SessionId),
        Kicked(SessionId),
        HudEnabled(SessionId),
    }

    struct Recorder(std_mpsc::Sender<SinkCall>);

    impl DisplayTagSink for Recorder {
        fn set_tag(&mut self, session: SessionId, _text: &str) {
            let _ = self.0.send(SinkCall::TagSet(session));
        }
        fn clear_tag(&mut self, session: SessionId) {
            let _ = self.0.send(SinkCall::TagCleared(session));
        }
    }
    impl MessageSink for Recorder {
        fn send(&mut self, session: SessionId, _text: &str) {
            let _ = self.0.send(SinkCall::Message(session));
        }
    }
    impl KickSink for Recorder {
        fn disconnect(&mut self, session: SessionId, _reason: &str) {
            let _ = self.0.send(SinkCall::Kicked(session));
        }
    }
    impl HudSink for Recorder {
        fn enable(&mut self, session: SessionId) {
            let _ = self.0.send(SinkCall::HudEnabled(session));
        }
    }

    fn test_dispatcher() -> (
        Dispatcher<MemoryExemptionStore, MemoryHudStore>,
        std_mpsc::Receiver<SinkCall>,
    ) {
        let (calls_tx, calls_rx) = std_mpsc::channel();
        let sinks = GameSinks {
            tags: Box::new(Recorder(calls_tx.clone())),
            messages: Box::new(Recorder(calls_tx.clone())),
            kick: Box::new(Recorder(calls_tx.clone())),
            hud: Box::new(Recorder(calls_tx)),
        };
        let (events, receiver) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            AfkConfig {
                initial_jitter_ms: 0,
                ..AfkConfig::default()
            }
            .validated(),
            Arc::new(MemoryExemptionStore::new()),
            Arc::new(MemoryHudStore::new()),
            sinks,
            events,
            receiver,
        );
        (dispatcher, calls_rx)
    }

    fn sid(id: u64) -> SessionId {
        SessionId(id)
    }

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    /// The session's currently registered generation id.
    fn current_timer(
        d: &Dispatcher<MemoryExemptionStore, MemoryHudStore>,
        session: SessionId,
    ) -> TimerId {
        d.registry.get(session).map(|h| h.id()).expect("timer registered")
    }

    #[tokio::test]
    async fn test_confirmed_from_stale_timer_is_dropped() {
        let (mut d, calls) = test_dispatcher();
        d.handle_event(DispatchEvent::SessionStarted {
            session: sid(1),
            player: pid(10),
        });
        let old = current_timer(&d, sid(1));

        // A command replaces the watchdog; the old generation's signals
        // must no longer be honored even though the session is live.
        d.handle_event(DispatchEvent::CommandAfk { session: sid(1) });
        calls.try_iter().for_each(drop); // command's own message+tag

        d.handle_event(DispatchEvent::AfkConfirmed {
            session: sid(1),
            timer: old,
        });
        d.handle_event(DispatchEvent::AfkCancelled {
            session: sid(1),
            timer: old,
        });
        d.handle_event(DispatchEvent::KickDue {
            session: sid(1),
            timer: old,
        });

        assert_eq!(calls.try_iter().count(), 0, "stale signals caused effects");
        // The cancelled signal in particular must not have re-armed a
        // fresh watchdog over the command's one.
        assert_eq!(
            d.snapshot(sid(1)).unwrap().state,
            AfkState::ConfirmedAfk
        );
    }

    #[tokio::test]
    async fn test_signals_after_session_end_are_dropped() {
        let (mut d, calls) = test_dispatcher();
        d.handle_event(DispatchEvent::SessionStarted {
            session: sid(1),
            player: pid(10),
        });
        let timer = current_timer(&d, sid(1));
        d.handle_event(DispatchEvent::SessionEnded { session: sid(1) });

        // Signals that were in flight when the session ended.
        d.handle_event(DispatchEvent::AfkConfirmed {
            session: sid(1),
            timer,
        });
        d.handle_event(DispatchEvent::KickDue {
            session: sid(1),
            timer,
        });
        d.handle_event(DispatchEvent::Activity { session: sid(1) });

        assert_eq!(calls.try_iter().count(), 0);
        assert!(d.snapshot(sid(1)).is_none());
        assert!(d.registry.is_empty(), "stale signal re-registered a timer");
    }

    #[tokio::test]
    async fn test_current_timer_signal_is_honored() {
        let (mut d, calls) = test_dispatcher();
        d.handle_event(DispatchEvent::SessionStarted {
            session: sid(1),
            player: pid(10),
        });
        let timer = current_timer(&d, sid(1));

        d.handle_event(DispatchEvent::AfkConfirmed {
            session: sid(1),
            timer,
        });

        let recorded: Vec<_> = calls.try_iter().collect();
        assert_eq!(
            recorded,
            vec![SinkCall::Message(sid(1)), SinkCall::TagSet(sid(1))]
        );
        assert_eq!(
            d.snapshot(sid(1)).unwrap().state,
            AfkState::ConfirmedAfk
        );
    }

    #[tokio::test]
    async fn test_cancelled_replaces_timer_generation() {
        let (mut d, _calls) = test_dispatcher();
        d.handle_event(DispatchEvent::SessionStarted {
            session: sid(1),
            player: pid(10),
        });
        let first = current_timer(&d, sid(1));

        d.handle_event(DispatchEvent::AfkCancelled {
            session: sid(1),
            timer: first,
        });

        let second = current_timer(&d, sid(1));
        assert_ne!(first, second, "cancel must re-arm a fresh watchdog");
        assert_eq!(d.registry.len(), 1);
    }

    #[tokio::test]
    async fn test_hud_checked_after_end_is_noop() {
        let (mut d, calls) = test_dispatcher();
        d.handle_event(DispatchEvent::SessionStarted {
            session: sid(1),
            player: pid(10),
        });
        d.handle_event(DispatchEvent::SessionEnded { session: sid(1) });

        d.handle_event(DispatchEvent::HudChecked {
            session: sid(1),
            enabled: true,
        });

        assert_eq!(calls.try_iter().count(), 0);
    }
}
