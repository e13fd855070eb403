//! Error types for the store layer.

/// Errors a store implementation can surface from a lookup.
///
/// The core treats every variant the same way — degrade to the safe
/// default and keep going — but implementations should still distinguish
/// them so operators can tell a dead connection pool from a bad query.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached (pool exhausted,
    /// connection refused, timeout).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store answered but the lookup itself failed.
    #[error("lookup failed: {0}")]
    Lookup(String),
}
