//! The per-session AFK watchdog: a cancelable, periodically re-armed task.
//!
//! One watchdog runs per live session. Each firing it answers one
//! question — "did the player do anything since the last firing?" — and
//! pushes the session one step through the AFK state machine: toward
//! confirmation and eventually a kick when idle, back toward active when
//! activity resumes.
//!
//! The watchdog runs in the worker domain and owns no shared state. It
//! reads the session's activity counter, queries the exemption store, and
//! emits signals into the dispatcher's event channel; every engine-visible
//! side effect happens over there. Signals carry the watchdog's
//! [`TimerId`] so the dispatcher can drop anything from a replaced or
//! cancelled generation.
//!
//! Firings are strictly sequential: the exemption lookup is awaited
//! before the next sleep is armed, so a slow store stretches the cycle
//! rather than overlapping two firings for the same session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use idlewatch_store::ExemptionStore;
use idlewatch_types::{AfkState, PlayerId, SessionId};
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::AfkConfig;
use crate::dispatcher::DispatchEvent;
use crate::registry::{TimerHandle, TimerId};

/// Spawns a watchdog task for one session and returns its handle.
///
/// `already_afk` is true only when the player explicitly requested AFK
/// via a command: the watchdog then starts in `ConfirmedAfk`, so its very
/// first idle firing goes straight to the exemption check and counts
/// toward the kick countdown instead of spending a cycle on confirmation.
///
/// The baseline is snapshotted from the activity counter here, not
/// assumed zero — a replacement watchdog must not misread the session's
/// earlier activity as new.
pub(crate) fn spawn_watchdog<E: ExemptionStore>(
    session: SessionId,
    player: PlayerId,
    already_afk: bool,
    config: &AfkConfig,
    activity: Arc<AtomicU64>,
    exemptions: Arc<E>,
    events: mpsc::UnboundedSender<DispatchEvent>,
) -> TimerHandle {
    let timer = TimerId::next();

    let watchdog = Watchdog {
        session,
        player,
        timer,
        period: config.period(),
        kick_after: config.kick_grace_cycles,
        baseline: activity.load(Ordering::Relaxed),
        phase: if already_afk {
            AfkState::ConfirmedAfk
        } else {
            AfkState::Active
        },
        idle_cycles: 0,
        activity,
        exemptions,
        events,
    };

    let jitter = first_firing_jitter(config.initial_jitter_ms);
    let join = tokio::spawn(watchdog.run(jitter));

    TimerHandle::new(timer, join.abort_handle())
}

/// Random delay added to the first firing so sessions started in the same
/// instant don't all fire together.
fn first_firing_jitter(max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_ms))
}

struct Watchdog<E> {
    session: SessionId,
    player: PlayerId,
    timer: TimerId,
    period: Duration,
    kick_after: u32,
    /// Last activity-counter value observed. Owned by this task alone.
    baseline: u64,
    /// Local phase; `Pending` only spans the in-flight exemption lookup.
    phase: AfkState,
    /// Consecutive idle firings while confirmed AFK.
    idle_cycles: u32,
    activity: Arc<AtomicU64>,
    exemptions: Arc<E>,
    events: mpsc::UnboundedSender<DispatchEvent>,
}

impl<E: ExemptionStore> Watchdog<E> {
    async fn run(mut self, jitter: Duration) {
        tokio::time::sleep(self.period + jitter).await;
        loop {
            if !self.fire().await {
                break;
            }
            tokio::time::sleep(self.period).await;
        }
        trace!(session = %self.session, timer = %self.timer, "watchdog stopped");
    }

    /// One firing. Returns `false` when the watchdog should stop (kick
    /// emitted, or the dispatcher is gone).
    async fn fire(&mut self) -> bool {
        let seen = self.activity.load(Ordering::Relaxed);
        let idle = seen == self.baseline;
        self.baseline = seen;

        trace!(
            session = %self.session,
            timer = %self.timer,
            idle,
            phase = %self.phase,
            "watchdog fired"
        );

        if !idle {
            // Activity resumed. Only meaningful if the player had been
            // observed idle; an active player staying active is silence.
            if self.phase.is_idle_observed() {
                self.phase = AfkState::Active;
                self.idle_cycles = 0;
                return self.emit(DispatchEvent::AfkCancelled {
                    session: self.session,
                    timer: self.timer,
                });
            }
            return true;
        }

        match self.phase {
            AfkState::Active | AfkState::Pending => {
                self.phase = AfkState::Pending;
                if self.is_exempt().await {
                    // Exempt players idle forever without escalation, but
                    // the watchdog keeps firing so a later activity burst
                    // is still observed against a fresh baseline.
                    self.phase = AfkState::Active;
                    return true;
                }
                self.phase = AfkState::ConfirmedAfk;
                self.idle_cycles = 0;
                self.emit(DispatchEvent::AfkConfirmed {
                    session: self.session,
                    timer: self.timer,
                })
            }
            AfkState::ConfirmedAfk => {
                if self.is_exempt().await {
                    return true;
                }
                self.idle_cycles += 1;
                if self.idle_cycles < self.kick_after {
                    trace!(
                        session = %self.session,
                        idle_cycles = self.idle_cycles,
                        kick_after = self.kick_after,
                        "kick countdown"
                    );
                    return true;
                }
                self.emit(DispatchEvent::KickDue {
                    session: self.session,
                    timer: self.timer,
                });
                false
            }
        }
    }

    /// Queries the exemption store. A lookup failure degrades to "not
    /// exempt": the kick policy stays enforced when the store is down.
    async fn is_exempt(&self) -> bool {
        match self.exemptions.is_exempt(self.player).await {
            Ok(exempt) => exempt,
            Err(e) => {
                warn!(
                    player = %self.player,
                    session = %self.session,
                    error = %e,
                    "exemption lookup failed — treating as not exempt"
                );
                false
            }
        }
    }

    /// Sends a signal to the dispatcher. Returns `false` if the channel
    /// is closed (dispatcher shut down), which stops the watchdog.
    fn emit(&self, event: DispatchEvent) -> bool {
        self.events.send(event).is_ok()
    }
}
