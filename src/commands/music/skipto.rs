use std::time::Duration;

use super::*;
use crate::commands::music::utils::{
    audio_sources::TrackMetadata,
    embedded_messages::{ALREADY_PLAYING, INVALID_POSITION, SKIPTO_FAILED},
    guards,
    music_manager::SessionSnapshot,
};

/// Pause between single skips when the engine cannot jump directly
pub const SKIP_STEP_DELAY: Duration = Duration::from_millis(100);

/// Validate a 1-based target position against the queue length
fn parse_position(raw: Option<&str>, queue_length: usize) -> Result<usize, Card> {
    let position = raw
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|position| *position >= 1)
        .ok_or_else(|| error_card(INVALID_POSITION))?;

    if position == 1 {
        return Err(error_card(ALREADY_PLAYING));
    }
    if position > queue_length {
        return Err(embedded_messages::position_out_of_range(queue_length));
    }
    Ok(position)
}

/// Advance one track at a time until `position` is current
async fn skip_stepwise(
    cx: &CommandContext<'_>,
    session: &SessionSnapshot,
    position: usize,
) -> MusicResult<TrackMetadata> {
    for step in 1..position {
        if step > 1 {
            tokio::time::sleep(SKIP_STEP_DELAY).await;
        }
        cx.call(cx.engine.skip(cx.guild_id())).await?;
    }

    session
        .tracks
        .get(position - 1)
        .cloned()
        .ok_or(MusicError::InvalidPosition(session.len()))
}

/// Skip straight to a position in the queue
pub async fn skipto(cx: &CommandContext<'_>, position: Option<&str>) -> CommandReply {
    guards::require_voice_channel(&cx.invocation)?;
    let session = guards::require_session(cx, "skipto").await?;
    let position = parse_position(position, session.len())?;

    let target = match cx.call(cx.engine.jump(cx.guild_id(), position)).await {
        Err(MusicError::JumpUnsupported) => {
            debug!("Direct jump unavailable, skipping {} times", position - 1);
            skip_stepwise(cx, &session, position).await
        }
        other => other,
    }
    .map_err(|err| cx.failure("skipto", err, SKIPTO_FAILED))?;

    Ok(Some(embedded_messages::skipped_to(&target, position)))
}
