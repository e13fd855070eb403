//! Identity newtypes and the AFK state enum.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's durable identity.
///
/// This is the key for everything persisted about a player — exemption
/// records, HUD preferences — because it survives disconnects and
/// reconnects. Contrast with [`SessionId`], which is tied to a single
/// connection.
///
/// `#[serde(transparent)]` serializes this as the bare `u64`, so a
/// `PlayerId(42)` is just `42` on the wire and in storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// One continuous connection instance of a player.
///
/// Created when the player connects, destroyed when they disconnect, and
/// never reused across reconnects — a player who drops and comes back gets
/// a fresh `SessionId` under the same [`PlayerId`]. All timer bookkeeping
/// is keyed by session, so state from a previous connection can never leak
/// into a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AfkState
// ---------------------------------------------------------------------------

/// Where a session sits in the AFK state machine.
///
/// ```text
///   Active ──(idle cycle)──→ Pending ──(not exempt)──→ ConfirmedAfk
///      ↑                        │                           │
///      │                     (exempt)                 (kick countdown)
///      └───────(activity)───────┴───────(activity)──────────┘
/// ```
///
/// - **Active**: the player has been seen doing something recently.
/// - **Pending**: an idle cycle was observed; the exemption verdict for
///   this cycle is still in flight.
/// - **ConfirmedAfk**: the player is marked AFK (tagged, notified) and
///   each further idle cycle counts toward the kick threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AfkState {
    Active,
    Pending,
    ConfirmedAfk,
}

impl AfkState {
    /// Returns `true` if the player is marked AFK.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::ConfirmedAfk)
    }

    /// Returns `true` if an idle observation is awaiting its exemption
    /// verdict or has already been confirmed — the states from which
    /// resumed activity triggers an AFK-cancelled transition.
    pub fn is_idle_observed(&self) -> bool {
        matches!(self, Self::Pending | Self::ConfirmedAfk)
    }
}

impl fmt::Display for AfkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Pending => write!(f, "Pending"),
            Self::ConfirmedAfk => write!(f, "ConfirmedAfk"),
        }
    }
}
