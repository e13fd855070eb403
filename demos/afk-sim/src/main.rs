//! A console simulation of the AFK watch.
//!
//! Three players join a pretend server with a 2-second watch period and a
//! 2-cycle kick grace:
//!
//! - Alice (P-1) keeps pressing keys and is never bothered.
//! - Bob (P-2) wanders off: tagged after one idle cycle, kicked two
//!   cycles later.
//! - Carol (P-3) is exempt and idles in peace.
//!
//! Run with `RUST_LOG=debug cargo run -p afk-sim` to watch the internals.

use std::sync::Arc;
use std::time::Duration;

use idlewatch::{
    AfkConfig, AfkError, DisplayTagSink, GameSinks, HudSink, KickSink,
    MessageSink, PlayerId, SessionId, spawn_dispatcher,
};
use idlewatch_store::{MemoryExemptionStore, MemoryHudStore};
use tracing_subscriber::EnvFilter;

/// Sinks that print what a real engine would render.
struct ConsoleSinks;

impl DisplayTagSink for ConsoleSinks {
    fn set_tag(&mut self, session: SessionId, text: &str) {
        println!("  [tab]  {session} now shows {text:?}");
    }
    fn clear_tag(&mut self, session: SessionId) {
        println!("  [tab]  {session} tag cleared");
    }
}

impl MessageSink for ConsoleSinks {
    fn send(&mut self, session: SessionId, text: &str) {
        println!("  [chat] to {session}: {text}");
    }
}

impl KickSink for ConsoleSinks {
    fn disconnect(&mut self, session: SessionId, reason: &str) {
        println!("  [kick] {session}: {reason}");
    }
}

impl HudSink for ConsoleSinks {
    fn enable(&mut self, session: SessionId) {
        println!("  [hud]  {session} HUD enabled");
    }
}

#[tokio::main]
async fn main() -> Result<(), AfkError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AfkConfig {
        period_secs: 2,
        kick_grace_cycles: 2,
        initial_jitter_ms: 250,
        ..AfkConfig::default()
    };

    let exemptions = Arc::new(MemoryExemptionStore::new());
    let hud = Arc::new(MemoryHudStore::new());

    let alice = (SessionId(1), PlayerId(1));
    let bob = (SessionId(2), PlayerId(2));
    let carol = (SessionId(3), PlayerId(3));

    exemptions.add(carol.1).await;
    hud.set(alice.1, true).await;

    let handle = spawn_dispatcher(
        config,
        exemptions,
        hud,
        GameSinks {
            tags: Box::new(ConsoleSinks),
            messages: Box::new(ConsoleSinks),
            kick: Box::new(ConsoleSinks),
            hud: Box::new(ConsoleSinks),
        },
    );

    println!("three players join");
    handle.session_started(alice.0, alice.1)?;
    handle.session_started(bob.0, bob.1)?;
    handle.session_started(carol.0, carol.1)?;

    // Alice keeps playing; Bob and Carol go quiet.
    let chatter = handle.clone();
    let alice_session = alice.0;
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            if chatter.activity(alice_session).is_err() {
                break;
            }
        }
    });

    // 2 s: Bob's first idle cycle → tagged. 6 s: grace exhausted → kicked.
    tokio::time::sleep(Duration::from_secs(8)).await;

    // A real engine fires session-end when the kick lands; stand in for it.
    println!("bob's connection drops after the kick");
    handle.session_ended(bob.0)?;

    let stats = handle.stats().await?;
    println!(
        "still online: {} sessions, {} timers armed",
        stats.sessions, stats.timers
    );

    for (session, _) in [alice, carol] {
        if let Some(snap) = handle.inspect(session).await? {
            println!("  {session}: {} (tagged: {})", snap.state, snap.tag_set);
        }
    }

    handle.shutdown()?;
    Ok(())
}
