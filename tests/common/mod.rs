//! Common test utilities, fixtures, and mocks
//! This module contains shared functionality used across the integration tests
#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;

use jukebox::commands::music::{CommandContext, Invocation, MusicCommand};
use jukebox::commands::music::utils::embedded_messages::Card;
use jukebox::commands::music::utils::music_manager::QueueEngine;
use jukebox::config::BotConfig;

/// Common test setup and utilities
pub mod test_utils {
    use std::sync::Once;
    use tracing::Level;

    static INIT: Once = Once::new();

    /// Initialize tracing once for the whole test binary
    pub fn init() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_max_level(Level::DEBUG)
                .with_test_writer()
                .init();
        });
    }
}

/// Parse a chat message the way the bot does and run it, returning the reply.
///
/// Panics if the message is not a known command.
pub async fn run_message(
    content: &str,
    invocation: Invocation,
    engine: &dyn QueueEngine,
    config: &BotConfig,
) -> Option<Card> {
    test_utils::init();
    let command = MusicCommand::parse(content, &config.prefix)
        .unwrap_or_else(|| panic!("`{}` is not a command", content));
    let cx = CommandContext::new(invocation, engine, config);
    command.execute(&cx).await
}
