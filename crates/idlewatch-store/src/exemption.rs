//! The exemption contract: which players may idle forever.

use idlewatch_types::PlayerId;

use crate::StoreError;

/// Answers "is this player exempt from AFK kicking?".
///
/// Queried once per watchdog cycle for an idle player, from a worker
/// task — never from the dispatch context. The result may arrive on any
/// thread; the core re-enters its dispatch channel before acting on it.
///
/// # Trait bounds
///
/// - `Send + Sync` → the store is shared across watchdog tasks via `Arc`.
/// - `'static` → it doesn't borrow temporary data; it lives as long as
///   the dispatcher.
///
/// # Failure semantics
///
/// A lookup error is treated by the core as **not exempt** — the kick
/// policy stays enforced when the store is down. Return `Err` honestly;
/// don't guess.
///
/// # Example
///
/// ```rust
/// use idlewatch_store::{ExemptionStore, StoreError};
/// use idlewatch_types::PlayerId;
///
/// /// Exempts nobody. Useful as a placeholder while wiring a server up.
/// struct NoExemptions;
///
/// impl ExemptionStore for NoExemptions {
///     async fn is_exempt(
///         &self,
///         _player: PlayerId,
///     ) -> Result<bool, StoreError> {
///         Ok(false)
///     }
/// }
/// ```
pub trait ExemptionStore: Send + Sync + 'static {
    /// Returns whether the player holds a persisted AFK exemption.
    fn is_exempt(
        &self,
        player: PlayerId,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;
}
