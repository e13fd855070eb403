//! Shared identity and state types for Idlewatch.
//!
//! Every other crate in the workspace speaks in terms of these types:
//!
//! - [`PlayerId`] — a player's durable identity (survives reconnects)
//! - [`SessionId`] — one continuous connection instance (never reused)
//! - [`AfkState`] — where a session sits in the AFK state machine
//!
//! # How it fits in the stack
//!
//! ```text
//! idlewatch (above)        ← dispatcher, watchdogs, timer registry
//!     ↕
//! idlewatch-store (above)  ← exemption and HUD preference contracts
//!     ↕
//! idlewatch-types (this crate)  ← the vocabulary they share
//! ```

mod types;

pub use types::{AfkState, PlayerId, SessionId};
