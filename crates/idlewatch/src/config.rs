//! AFK tracking configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for AFK detection and enforcement.
///
/// One copy lives in the dispatcher; every watchdog it spawns reads the
/// timing knobs from it. Host servers can deserialize this straight from
/// their config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AfkConfig {
    /// Seconds between watchdog firings. Each firing asks "did the player
    /// do anything since the last one?".
    pub period_secs: u64,

    /// How many consecutive idle firings a confirmed-AFK player gets
    /// before being disconnected. A command-triggered AFK's first firing
    /// already counts toward this.
    pub kick_grace_cycles: u32,

    /// Random jitter (0–max ms) added to a watchdog's *first* firing so
    /// that players who joined in the same instant don't all fire at once
    /// (thundering-herd mitigation).
    pub initial_jitter_ms: u64,

    /// Message sent to the player when they are marked AFK.
    pub afk_message: String,

    /// Text appended to the player's visible name while AFK.
    pub tag_text: String,

    /// Reason string passed to the kick action.
    pub kick_reason: String,
}

impl Default for AfkConfig {
    fn default() -> Self {
        Self {
            period_secs: 60,
            kick_grace_cycles: 5,
            initial_jitter_ms: 1_500,
            afk_message: "You are now AFK".to_string(),
            tag_text: "[AFK] ".to_string(),
            kick_reason: "Kicked for being AFK".to_string(),
        }
    }
}

impl AfkConfig {
    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically when the dispatcher is spawned. Rules:
    /// - `period_secs` raised to at least 1.
    /// - `kick_grace_cycles` raised to at least 1 (0 would kick a player
    ///   the instant they were confirmed).
    /// - `initial_jitter_ms` capped below one period so the first firing
    ///   can never lag a full cycle behind.
    pub fn validated(mut self) -> Self {
        if self.period_secs == 0 {
            warn!("period_secs of 0 is invalid — raising to 1");
            self.period_secs = 1;
        }
        if self.kick_grace_cycles == 0 {
            warn!("kick_grace_cycles of 0 is invalid — raising to 1");
            self.kick_grace_cycles = 1;
        }
        let period_ms = self.period_secs.saturating_mul(1_000);
        if self.initial_jitter_ms >= period_ms {
            warn!(
                jitter_ms = self.initial_jitter_ms,
                period_ms,
                "initial_jitter_ms exceeds the period — capping"
            );
            self.initial_jitter_ms = period_ms / 2;
        }
        self
    }

    /// The watchdog firing period.
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}
