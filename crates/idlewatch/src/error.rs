//! Unified error type for the Idlewatch core.

use idlewatch_store::StoreError;

/// Top-level error for embedders of the core crate.
///
/// Almost nothing in the AFK subsystem is an error from the caller's
/// perspective — stale signals, unknown sessions, and failed lookups all
/// degrade internally. What remains is a dispatcher that is no longer
/// running, plus store errors surfaced when embedders compose store
/// calls with core calls in one `?` chain (the `#[from]` conversion
/// covers that).
#[derive(Debug, thiserror::Error)]
pub enum AfkError {
    /// The dispatcher task has stopped; the event could not be delivered.
    #[error("afk dispatcher is not running")]
    Unavailable,

    /// A store-level error (exemption or HUD preference lookup).
    #[error(transparent)]
    Store(#[from] StoreError),
}
