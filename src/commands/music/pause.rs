use super::*;
use crate::commands::music::utils::{
    embedded_messages::{PAUSE_FAILED, PAUSED, success_card},
    guards,
};

/// Pause the current track
pub async fn pause(cx: &CommandContext<'_>) -> CommandReply {
    guards::require_session(cx, "pause").await?;

    cx.call(cx.engine.pause(cx.guild_id()))
        .await
        .map_err(|err| cx.failure("pause", err, PAUSE_FAILED))?;

    Ok(Some(success_card(PAUSED)))
}
