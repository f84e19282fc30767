use super::*;
use crate::commands::music::utils::{
    embedded_messages::{INVALID_VOLUME, VOLUME_FAILED},
    guards,
};

/// Accepts whole numbers from 0 to 100
fn parse_volume(raw: Option<&str>) -> Option<u8> {
    raw?.parse::<u8>().ok().filter(|volume| *volume <= 100)
}

/// Set the playback volume
pub async fn volume(cx: &CommandContext<'_>, level: Option<&str>) -> CommandReply {
    let volume = parse_volume(level).ok_or_else(|| error_card(INVALID_VOLUME))?;
    guards::require_session(cx, "volume").await?;

    cx.call(cx.engine.set_volume(cx.guild_id(), volume))
        .await
        .map_err(|err| cx.failure("volume", err, VOLUME_FAILED))?;

    Ok(Some(embedded_messages::volume_set(volume)))
}
