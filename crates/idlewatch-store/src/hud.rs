//! The HUD preference contract.

use idlewatch_types::PlayerId;

use crate::StoreError;

/// Answers "did this player opt into the heads-up display?".
///
/// Queried exactly once, when the player's session starts. The core fires
/// the lookup as a free task; by the time the answer comes back the
/// session may already be gone, in which case the answer is dropped.
///
/// # Failure semantics
///
/// A lookup error is treated by the core as **disabled** — a player whose
/// preference can't be read simply doesn't get the HUD this session.
pub trait HudPreferenceStore: Send + Sync + 'static {
    /// Returns whether the player enabled the HUD.
    fn is_enabled(
        &self,
        player: PlayerId,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;
}
