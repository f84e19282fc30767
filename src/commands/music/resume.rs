use super::*;
use crate::commands::music::utils::{
    embedded_messages::{RESUME_FAILED, RESUMED, success_card},
    guards,
};

/// Resume the paused track
pub async fn resume(cx: &CommandContext<'_>) -> CommandReply {
    guards::require_session(cx, "resume").await?;

    cx.call(cx.engine.resume(cx.guild_id()))
        .await
        .map_err(|err| cx.failure("resume", err, RESUME_FAILED))?;

    Ok(Some(success_card(RESUMED)))
}
