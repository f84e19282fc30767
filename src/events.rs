//! Gateway event routing for the poise framework.

use poise::serenity_prelude as serenity;
use serenity::all::{ActivityData, Context, FullEvent, VoiceState};
use serenity::model::id::{ChannelId, GuildId};
use tracing::{debug, error, info, warn};

use crate::commands::music::handle_message;
use crate::{Data, Error};

/// One member's position in a guild's voice channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceOccupant {
    pub channel: Option<ChannelId>,
    pub is_bot: bool,
}

/// Count the human members connected to `channel`
pub fn count_listeners(
    channel: ChannelId,
    occupants: impl IntoIterator<Item = VoiceOccupant>,
) -> usize {
    occupants
        .into_iter()
        .filter(|occupant| occupant.channel == Some(channel) && !occupant.is_bot)
        .count()
}

pub async fn event_handler(
    ctx: &Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("{} is connected!", data_about_bot.user.tag());
            ctx.set_activity(Some(ActivityData::listening("music")));
        }
        FullEvent::Message { new_message } => {
            handle_message(ctx, data, new_message).await?;
        }
        FullEvent::VoiceStateUpdate { new, .. } => {
            voice_state_changed(ctx, data, new).await;
        }
        _ => {}
    }
    Ok(())
}

/// Tell the engine how many listeners are left with the bot after someone
/// joins, leaves or moves.
async fn voice_state_changed(ctx: &Context, data: &Data, state: &VoiceState) {
    let Some(guild_id) = state.guild_id else {
        return;
    };
    let bot_id = ctx.cache.current_user().id;
    if state.user_id == bot_id {
        return;
    }

    let Some(listeners) = listeners_with_bot(ctx, guild_id, bot_id) else {
        return;
    };

    debug!(
        "Voice state changed in guild {}: {} listener(s) with the bot",
        guild_id, listeners
    );
    if let Err(e) = data.engine.listeners_changed(guild_id, listeners).await {
        warn!(
            "Failed to handle listener change in guild {}: {}",
            guild_id, e
        );
    }
}

fn listeners_with_bot(
    ctx: &Context,
    guild_id: GuildId,
    bot_id: serenity::UserId,
) -> Option<usize> {
    let guild = ctx.cache.guild(guild_id)?;
    let bot_channel = guild.voice_states.get(&bot_id)?.channel_id?;

    let occupants = guild.voice_states.values().map(|voice| VoiceOccupant {
        channel: voice.channel_id,
        is_bot: voice.user_id == bot_id
            || voice
                .member
                .as_ref()
                .map(|member| member.user.bot)
                .or_else(|| guild.members.get(&voice.user_id).map(|member| member.user.bot))
                .unwrap_or(false),
    });

    Some(count_listeners(bot_channel, occupants))
}

/// Framework error hook. Logs and never re-raises.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to set up the framework: {}", error)
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!(
                "Error while handling `{}` event: {}",
                event.snake_case_name(),
                error
            )
        }
        poise::FrameworkError::UnknownCommand { .. } => {}
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling framework error: {}", e);
            }
        }
    }
}
