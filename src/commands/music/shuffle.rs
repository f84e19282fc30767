use super::*;
use crate::commands::music::utils::{
    embedded_messages::{SHUFFLE_FAILED, SHUFFLED, success_card},
    guards,
};

/// Shuffle everything after the current track
pub async fn shuffle(cx: &CommandContext<'_>) -> CommandReply {
    guards::require_session(cx, "shuffle").await?;

    cx.call(cx.engine.shuffle(cx.guild_id()))
        .await
        .map_err(|err| cx.failure("shuffle", err, SHUFFLE_FAILED))?;

    Ok(Some(success_card(SHUFFLED)))
}
