//! In-memory store implementations for development and tests.
//!
//! These hold everything in mutex-guarded maps. They are not durable and
//! not meant for production — a real deployment backs the contracts with
//! its existing database. They exist so the core can be run and tested
//! without standing up any infrastructure.

use std::collections::{HashMap, HashSet};

use idlewatch_types::PlayerId;
use tokio::sync::Mutex;

use crate::{ExemptionStore, HudPreferenceStore, StoreError};

/// An exemption set held in memory.
#[derive(Debug, Default)]
pub struct MemoryExemptionStore {
    entries: Mutex<HashSet<PlayerId>>,
}

impl MemoryExemptionStore {
    /// Creates an empty store — nobody is exempt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants the player an exemption.
    pub async fn add(&self, player: PlayerId) {
        self.entries.lock().await.insert(player);
        tracing::debug!(%player, "exemption granted");
    }

    /// Revokes the player's exemption. No-op if they had none.
    pub async fn remove(&self, player: PlayerId) {
        self.entries.lock().await.remove(&player);
        tracing::debug!(%player, "exemption revoked");
    }
}

impl ExemptionStore for MemoryExemptionStore {
    fn is_exempt(
        &self,
        player: PlayerId,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send
    {
        async move { Ok(self.entries.lock().await.contains(&player)) }
    }
}

/// HUD preferences held in memory.
///
/// A player with no recorded preference is treated as disabled, matching
/// the core's degrade-to-disabled posture for failed lookups.
#[derive(Debug, Default)]
pub struct MemoryHudStore {
    prefs: Mutex<HashMap<PlayerId, bool>>,
}

impl MemoryHudStore {
    /// Creates an empty store — no recorded preferences.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the player's HUD preference.
    pub async fn set(&self, player: PlayerId, enabled: bool) {
        self.prefs.lock().await.insert(player, enabled);
        tracing::debug!(%player, enabled, "hud preference recorded");
    }
}

impl HudPreferenceStore for MemoryHudStore {
    fn is_enabled(
        &self,
        player: PlayerId,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send
    {
        async move {
            Ok(self
                .prefs
                .lock()
                .await
                .get(&player)
                .copied()
                .unwrap_or(false))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    #[tokio::test]
    async fn test_is_exempt_unknown_player_returns_false() {
        let store = MemoryExemptionStore::new();
        assert!(!store.is_exempt(pid(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_then_is_exempt_returns_true() {
        let store = MemoryExemptionStore::new();
        store.add(pid(1)).await;

        assert!(store.is_exempt(pid(1)).await.unwrap());
        // Other players are unaffected.
        assert!(!store.is_exempt(pid(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_revokes_exemption() {
        let store = MemoryExemptionStore::new();
        store.add(pid(1)).await;
        store.remove(pid(1)).await;

        assert!(!store.is_exempt(pid(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_unknown_player_is_noop() {
        let store = MemoryExemptionStore::new();
        store.remove(pid(99)).await;

        assert!(!store.is_exempt(pid(99)).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_enabled_defaults_to_disabled() {
        let store = MemoryHudStore::new();
        assert!(!store.is_enabled(pid(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_records_preference_per_player() {
        let store = MemoryHudStore::new();
        store.set(pid(1), true).await;
        store.set(pid(2), false).await;

        assert!(store.is_enabled(pid(1)).await.unwrap());
        assert!(!store.is_enabled(pid(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_overwrites_previous_preference() {
        let store = MemoryHudStore::new();
        store.set(pid(1), true).await;
        store.set(pid(1), false).await;

        assert!(!store.is_enabled(pid(1)).await.unwrap());
    }
}
