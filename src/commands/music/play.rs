use super::*;
use crate::commands::music::utils::{
    embedded_messages::{MISSING_QUERY, PLAY_FAILED},
    guards,
    music_manager::PlayRequest,
};

/// Play a song or add it to the queue.
///
/// Nothing is replied on success; the event bridge announces the track.
/// Only resolution is bounded by the engine timeout: once tracks are known
/// they are queued in full.
pub async fn play(cx: &CommandContext<'_>, query: &str) -> CommandReply {
    let voice_channel = guards::require_voice_channel(&cx.invocation)?;
    guards::require_bot_permissions(&cx.invocation)?;

    let query = query.trim();
    if query.is_empty() {
        return Err(error_card(MISSING_QUERY));
    }

    let resolved = cx
        .call(cx.engine.resolve(query, &cx.invocation.requester))
        .await
        .map_err(|err| cx.failure("play", err, PLAY_FAILED))?;
    debug!(
        "`{}` resolved to {} track(s) in guild {}",
        query,
        resolved.tracks.len(),
        cx.guild_id()
    );

    let request = PlayRequest {
        guild_id: cx.guild_id(),
        voice_channel,
        text_channel: cx.invocation.text_channel,
        query: query.to_string(),
        requester: cx.invocation.requester.clone(),
    };

    cx.engine
        .enqueue(request, resolved)
        .await
        .map_err(|err| cx.failure("play", err, PLAY_FAILED))?;

    Ok(None)
}
