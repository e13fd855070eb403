//! Engine side-effect traits — the seams the host server implements.
//!
//! Idlewatch decides *when* to tag, message, or kick a player; the host
//! engine decides *how*. These traits are that boundary. The dispatcher
//! owns one boxed implementation of each and invokes them only from its
//! own task, so implementations may touch engine state that is not
//! thread-safe (a tab list, a scoreboard) without their own locking —
//! provided the engine's dispatch context and this task line up, which is
//! the embedder's wiring decision.
//!
//! All methods are fire-and-forget from the core's perspective: there is
//! nothing sensible for it to do with a delivery failure, so none of them
//! return one. An implementation that needs to do real I/O should hand
//! the work off internally rather than block the dispatcher.

use idlewatch_types::SessionId;

/// Applies and clears the visible AFK marker on a player's name.
///
/// Only ever invoked from the dispatcher task — the rendering surface
/// behind it is assumed not to be thread-safe.
pub trait DisplayTagSink: Send + 'static {
    /// Shows `text` as the player's AFK marker.
    fn set_tag(&mut self, session: SessionId, text: &str);

    /// Removes the player's AFK marker.
    fn clear_tag(&mut self, session: SessionId);
}

/// Delivers a chat/notification message to a player.
pub trait MessageSink: Send + 'static {
    /// Sends `text` to the player. Fire-and-forget.
    fn send(&mut self, session: SessionId, text: &str);
}

/// Disconnects a player from the server.
///
/// Terminal: after this the engine is expected to deliver the session-end
/// signal for the same session, which performs the core's cleanup.
pub trait KickSink: Send + 'static {
    /// Disconnects the player, showing them `reason`.
    fn disconnect(&mut self, session: SessionId, reason: &str);
}

/// Activates the heads-up display for a player who opted into it.
///
/// Called at most once per session, after the preference lookup resolves
/// and the session is confirmed still live.
pub trait HudSink: Send + 'static {
    /// Turns the HUD on for the player.
    fn enable(&mut self, session: SessionId);
}

/// The full set of engine sinks, passed to the dispatcher at spawn.
pub struct GameSinks {
    pub tags: Box<dyn DisplayTagSink>,
    pub messages: Box<dyn MessageSink>,
    pub kick: Box<dyn KickSink>,
    pub hud: Box<dyn HudSink>,
}
