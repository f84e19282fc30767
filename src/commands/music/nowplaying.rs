use super::*;
use crate::commands::music::utils::{embedded_messages::UNEXPECTED_ERROR, guards};

/// Show the current track together with session volume and state
pub async fn nowplaying(cx: &CommandContext<'_>) -> CommandReply {
    let session = guards::require_session(cx, "nowplaying").await?;
    let track = session
        .current()
        .ok_or_else(|| error_card(UNEXPECTED_ERROR))?;

    Ok(Some(embedded_messages::now_playing_detail(
        track,
        session.volume,
        session.paused,
    )))
}
