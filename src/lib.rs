//! A prefix-command Discord music bot.
//!
//! Chat commands are parsed into a closed [`commands::music::MusicCommand`] set and
//! executed against a [`QueueEngine`], which is backed by songbird's builtin
//! track queue in production. Engine lifecycle events are rendered back into the
//! guild's text channel by the event bridge.

use std::sync::Arc;

pub mod commands;
pub mod config;
pub mod events;

use commands::music::utils::music_manager::QueueEngine;
use config::BotConfig;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type CommandResult = Result<(), Error>;

/// User data, which is stored and accessible in every framework event
pub struct Data {
    pub config: BotConfig,
    pub engine: Arc<dyn QueueEngine>,
}
