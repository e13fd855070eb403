//! Persistence contracts consumed by the Idlewatch core.
//!
//! Idlewatch doesn't implement persistence itself — that's the host
//! server's job (Postgres, Redis, a flat file, whatever it already runs).
//! This crate defines the two async contracts the core queries:
//!
//! 1. **Exemption** — is this player allowed to idle forever?
//!    ([`ExemptionStore`])
//! 2. **HUD preference** — did this player opt into the heads-up display?
//!    ([`HudPreferenceStore`])
//!
//! Both are keyed by [`PlayerId`] (durable identity), never by session —
//! a player's exemption must survive reconnects.
//!
//! Lookups may block on I/O, so implementations run them on whatever
//! worker pool they like; callers only see a future. The core never lets
//! a store failure escalate: a failed exemption lookup degrades to "not
//! exempt" and a failed HUD lookup to "disabled" at the call sites.
//!
//! [`MemoryExemptionStore`] and [`MemoryHudStore`] are in-memory
//! implementations for development and tests.

mod error;
mod exemption;
mod hud;
mod memory;

pub use error::StoreError;
pub use exemption::ExemptionStore;
pub use hud::HudPreferenceStore;
pub use memory::{MemoryExemptionStore, MemoryHudStore};
