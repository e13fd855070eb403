//! Per-player AFK tracking and kick enforcement for game servers.
//!
//! Idlewatch watches every live session for idleness, marks idle players
//! with a visible AFK tag, and disconnects them after a configurable
//! grace period — unless a persisted exemption says otherwise.
//!
//! The moving parts:
//!
//! 1. **Dispatcher** — a single actor task owning all AFK state; every
//!    engine event and watchdog signal funnels through its channel, and
//!    every engine-visible side effect happens inside it
//!    ([`spawn_dispatcher`], [`AfkHandle`])
//! 2. **Watchdogs** — one cancelable periodic task per session,
//!    evaluating idleness and querying the exemption store
//! 3. **Timer registry** — at most one live watchdog per session, with
//!    atomic replace-and-cancel ([`TimerRegistry`])
//! 4. **Sinks** — the seams the host engine implements: tags, messages,
//!    kicks, HUD activation ([`GameSinks`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Host engine (above)       ← feeds events in via AfkHandle,
//!     ↕                        receives side effects via GameSinks
//! Core (this crate)         ← the state machine and its timers
//!     ↕
//! idlewatch-store (below)   ← exemption and HUD preference contracts
//! idlewatch-types (below)   ← PlayerId, SessionId, AfkState
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use idlewatch::{spawn_dispatcher, AfkConfig, GameSinks};
//! use idlewatch_store::{MemoryExemptionStore, MemoryHudStore};
//! use idlewatch_types::{PlayerId, SessionId};
//!
//! # fn sinks() -> GameSinks { unimplemented!() }
//! # async fn demo() -> Result<(), idlewatch::AfkError> {
//! let handle = spawn_dispatcher(
//!     AfkConfig::default(),
//!     Arc::new(MemoryExemptionStore::new()),
//!     Arc::new(MemoryHudStore::new()),
//!     sinks(), // your engine's GameSinks implementation
//! );
//!
//! // Wire these into your engine's join/quit/command/input hooks:
//! handle.session_started(SessionId(1), PlayerId(42))?;
//! handle.activity(SessionId(1))?;
//! # Ok(())
//! # }
//! ```

mod config;
mod dispatcher;
mod error;
mod registry;
mod sinks;
mod watchdog;

pub use config::AfkConfig;
pub use dispatcher::{AfkHandle, SessionSnapshot, Stats, spawn_dispatcher};
pub use error::AfkError;
pub use registry::{TimerHandle, TimerId, TimerRegistry};
pub use sinks::{DisplayTagSink, GameSinks, HudSink, KickSink, MessageSink};

// The vocabulary crates, re-exported for convenience.
pub use idlewatch_store::{ExemptionStore, HudPreferenceStore, StoreError};
pub use idlewatch_types::{AfkState, PlayerId, SessionId};
