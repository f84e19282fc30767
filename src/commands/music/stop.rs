use super::*;
use crate::commands::music::utils::{
    embedded_messages::{STOP_FAILED, STOPPED, success_card},
    guards,
};

/// Stop playback and clear the queue
pub async fn stop(cx: &CommandContext<'_>) -> CommandReply {
    guards::require_session(cx, "stop").await?;

    cx.call(cx.engine.stop(cx.guild_id()))
        .await
        .map_err(|err| cx.failure("stop", err, STOP_FAILED))?;

    Ok(Some(success_card(STOPPED)))
}
