use super::*;
use crate::commands::music::utils::{
    embedded_messages::{BOT_NOT_IN_VOICE, LEAVE_FAILED, LEFT, NOT_SAME_CHANNEL, success_card},
    guards,
};

/// Leave the voice channel, stopping playback first
pub async fn leave(cx: &CommandContext<'_>) -> CommandReply {
    let caller_voice = guards::require_voice_channel(&cx.invocation)?;
    let bot_voice = cx
        .invocation
        .bot_voice
        .ok_or_else(|| error_card(BOT_NOT_IN_VOICE))?;
    if caller_voice != bot_voice {
        return Err(error_card(NOT_SAME_CHANNEL));
    }

    let guild_id = cx.guild_id();
    let result = async {
        if cx.call(cx.engine.session(guild_id)).await?.is_some() {
            cx.call(cx.engine.stop(guild_id)).await?;
        }
        match cx.call(cx.engine.disconnect(guild_id)).await {
            // Songbird has no call, e.g. after a restart; there is nothing left to leave.
            Err(MusicError::NotConnected) => {
                debug!("No voice connection to drop in guild {}", guild_id);
                Ok(())
            }
            other => other,
        }
    }
    .await;

    result.map_err(|err| cx.failure("leave", err, LEAVE_FAILED))?;

    Ok(Some(success_card(LEFT)))
}
