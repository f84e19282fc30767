//! Precondition checks shared by the music commands.
//!
//! Each guard returns the card to reply with when the check fails, so handlers
//! can bail out with `?` before touching the engine.

use serenity::model::id::ChannelId;

use crate::commands::music::{CommandContext, Invocation};

use super::embedded_messages::{
    Card, NO_PERMISSION, NOT_IN_VOICE, NOTHING_PLAYING, UNEXPECTED_ERROR, error_card,
};
use super::music_manager::SessionSnapshot;

/// The caller must be connected to a voice channel
pub fn require_voice_channel(invocation: &Invocation) -> Result<ChannelId, Card> {
    invocation
        .caller_voice
        .ok_or_else(|| error_card(NOT_IN_VOICE))
}

/// The bot must be allowed to connect and speak in the caller's channel
pub fn require_bot_permissions(invocation: &Invocation) -> Result<(), Card> {
    if invocation.bot_can_speak {
        Ok(())
    } else {
        Err(error_card(NO_PERMISSION))
    }
}

/// The guild must have a non-empty session
pub async fn require_session(
    cx: &CommandContext<'_>,
    command: &str,
) -> Result<SessionSnapshot, Card> {
    match cx.call(cx.engine.session(cx.guild_id())).await {
        Ok(Some(session)) if !session.is_empty() => Ok(session),
        Ok(_) => Err(error_card(NOTHING_PLAYING)),
        Err(err) => Err(cx.failure(command, err, UNEXPECTED_ERROR)),
    }
}
