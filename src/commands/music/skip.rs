use super::*;
use crate::commands::music::utils::{
    embedded_messages::{SKIP_FAILED, SKIPPED, success_card},
    guards,
};

/// Skip the current track
pub async fn skip(cx: &CommandContext<'_>) -> CommandReply {
    guards::require_session(cx, "skip").await?;

    cx.call(cx.engine.skip(cx.guild_id()))
        .await
        .map_err(|err| cx.failure("skip", err, SKIP_FAILED))?;

    Ok(Some(success_card(SKIPPED)))
}
