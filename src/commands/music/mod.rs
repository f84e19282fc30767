//! The music command table.
//!
//! Chat messages are parsed into a [`MusicCommand`], then executed against the
//! [`QueueEngine`] with the caller's [`Invocation`] snapshot.

pub(crate) mod help;
pub(crate) mod leave;
pub(crate) mod nowplaying;
pub(crate) mod pause;
pub(crate) mod play;
pub(crate) mod queue;
pub(crate) mod resume;
pub(crate) mod shuffle;
pub(crate) mod skip;
pub(crate) mod skipto;
pub(crate) mod stop;
pub(crate) mod volume;

pub mod utils;

use std::future::Future;

use poise::serenity_prelude as serenity;
use serenity::all::{CreateMessage, Message};
use serenity::model::id::{ChannelId, GuildId, UserId};
use tracing::{debug, error, warn};

use crate::config::BotConfig;
use crate::{CommandResult, Data};

use utils::audio_sources::Requester;
use utils::embedded_messages::{self, Card, error_card};
use utils::music_manager::{MusicError, MusicResult, QueueEngine};

/// What a handler replies with: `Ok(None)` sends nothing, `Err` carries a
/// precondition or argument failure.
pub type CommandReply = Result<Option<Card>, Card>;

/// Every command the bot understands, with its raw argument slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicCommand {
    Play { query: String },
    Pause,
    Resume,
    Skip,
    Stop,
    Shuffle,
    Volume { level: Option<String> },
    Queue { page: Option<String> },
    NowPlaying,
    SkipTo { position: Option<String> },
    Leave,
    Help,
}

impl MusicCommand {
    /// Parse a message body. Returns `None` when it does not start with the
    /// prefix or names no known command. Whitespace may separate the prefix
    /// from the command name.
    pub fn parse(content: &str, prefix: &str) -> Option<Self> {
        let body = content.strip_prefix(prefix)?;
        let mut words = body.split_whitespace();
        let name = words.next()?.to_lowercase();
        let first = words.clone().next().map(str::to_string);

        let command = match name.as_str() {
            "play" => Self::Play {
                query: words.collect::<Vec<_>>().join(" "),
            },
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "skip" => Self::Skip,
            "stop" => Self::Stop,
            "shuffle" => Self::Shuffle,
            "volume" => Self::Volume { level: first },
            "queue" => Self::Queue { page: first },
            "nowplaying" | "np" => Self::NowPlaying,
            "skipto" => Self::SkipTo { position: first },
            "leave" => Self::Leave,
            "help" => Self::Help,
            _ => return None,
        };

        Some(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Play { .. } => "play",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Skip => "skip",
            Self::Stop => "stop",
            Self::Shuffle => "shuffle",
            Self::Volume { .. } => "volume",
            Self::Queue { .. } => "queue",
            Self::NowPlaying => "nowplaying",
            Self::SkipTo { .. } => "skipto",
            Self::Leave => "leave",
            Self::Help => "help",
        }
    }

    /// Run the command and return the reply card, if any.
    pub async fn execute(self, cx: &CommandContext<'_>) -> Option<Card> {
        let reply = match &self {
            Self::Play { query } => play::play(cx, query).await,
            Self::Pause => pause::pause(cx).await,
            Self::Resume => resume::resume(cx).await,
            Self::Skip => skip::skip(cx).await,
            Self::Stop => stop::stop(cx).await,
            Self::Shuffle => shuffle::shuffle(cx).await,
            Self::Volume { level } => volume::volume(cx, level.as_deref()).await,
            Self::Queue { page } => queue::queue(cx, page.as_deref()).await,
            Self::NowPlaying => nowplaying::nowplaying(cx).await,
            Self::SkipTo { position } => skipto::skipto(cx, position.as_deref()).await,
            Self::Leave => leave::leave(cx).await,
            Self::Help => Ok(Some(help::help(cx))),
        };

        reply.unwrap_or_else(Some)
    }
}

/// Who invoked a command, and where, as seen in the cache at receipt time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub guild_id: GuildId,
    pub text_channel: ChannelId,
    pub requester: Requester,
    pub caller_voice: Option<ChannelId>,
    pub bot_voice: Option<ChannelId>,
    /// Whether the bot may connect and speak in `caller_voice`
    pub bot_can_speak: bool,
}

impl Invocation {
    /// Build from a guild message. Returns `None` for direct messages or
    /// guilds missing from the cache.
    pub fn from_message(ctx: &serenity::Context, msg: &Message) -> Option<Self> {
        let guild_id = msg.guild_id?;
        let bot_id = ctx.cache.current_user().id;

        let Some(guild) = ctx.cache.guild(guild_id) else {
            warn!("Guild {} is not cached, ignoring command", guild_id);
            return None;
        };

        let voice_channel_of = |user: UserId| {
            guild
                .voice_states
                .get(&user)
                .and_then(|state| state.channel_id)
        };
        let caller_voice = voice_channel_of(msg.author.id);
        let bot_voice = voice_channel_of(bot_id);

        let bot_can_speak = caller_voice
            .and_then(|channel_id| {
                let channel = guild.channels.get(&channel_id)?;
                let member = guild.members.get(&bot_id)?;
                Some(guild.user_permissions_in(channel, member))
            })
            .is_some_and(|permissions| permissions.connect() && permissions.speak());

        let name = msg
            .member
            .as_ref()
            .and_then(|member| member.nick.clone())
            .unwrap_or_else(|| msg.author.display_name().to_string());

        Some(Self {
            guild_id,
            text_channel: msg.channel_id,
            requester: Requester {
                id: msg.author.id,
                name,
            },
            caller_voice,
            bot_voice,
            bot_can_speak,
        })
    }
}

/// Everything a command handler gets to work with
pub struct CommandContext<'a> {
    pub invocation: Invocation,
    pub engine: &'a dyn QueueEngine,
    pub config: &'a BotConfig,
}

impl<'a> CommandContext<'a> {
    pub fn new(invocation: Invocation, engine: &'a dyn QueueEngine, config: &'a BotConfig) -> Self {
        Self {
            invocation,
            engine,
            config,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.invocation.guild_id
    }

    /// Await an engine call, giving up after the configured timeout
    pub async fn call<T>(&self, operation: impl Future<Output = MusicResult<T>>) -> MusicResult<T> {
        let limit = self.config.engine_timeout;
        tokio::time::timeout(limit, operation)
            .await
            .unwrap_or(Err(MusicError::Timeout(limit)))
    }

    /// Log an engine failure and turn it into the command's generic reply
    pub fn failure(&self, command: &str, err: MusicError, message: &str) -> Card {
        match err {
            MusicError::Timeout(limit) => {
                warn!(
                    "Command `{}` in guild {} timed out after {:?}",
                    command,
                    self.guild_id(),
                    limit
                );
                embedded_messages::taking_too_long()
            }
            err => {
                error!(
                    "Command `{}` failed in guild {}: {}",
                    command,
                    self.guild_id(),
                    err
                );
                error_card(message)
            }
        }
    }
}

/// Entry point for every message the bot sees
pub async fn handle_message(ctx: &serenity::Context, data: &Data, msg: &Message) -> CommandResult {
    if msg.author.bot {
        return Ok(());
    }
    let Some(command) = MusicCommand::parse(&msg.content, &data.config.prefix) else {
        return Ok(());
    };
    let Some(invocation) = Invocation::from_message(ctx, msg) else {
        return Ok(());
    };

    debug!(
        "Dispatching `{}` from {} in guild {}",
        command.name(),
        invocation.requester.name,
        invocation.guild_id
    );

    let cx = CommandContext::new(invocation, data.engine.as_ref(), &data.config);
    if let Some(card) = command.execute(&cx).await {
        msg.channel_id
            .send_message(
                &ctx.http,
                CreateMessage::new()
                    .embed(card.into())
                    .reference_message(msg),
            )
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("%play never gonna  give you up", MusicCommand::Play { query: "never gonna give you up".to_string() } ; "play joins words")]
    #[test_case("%play", MusicCommand::Play { query: String::new() } ; "play without query")]
    #[test_case("%PAUSE", MusicCommand::Pause ; "case insensitive")]
    #[test_case("%np", MusicCommand::NowPlaying ; "nowplaying alias")]
    #[test_case("%volume 40 extra", MusicCommand::Volume { level: Some("40".to_string()) } ; "first argument only")]
    #[test_case("%queue", MusicCommand::Queue { page: None } ; "queue without page")]
    #[test_case("%skipto 3", MusicCommand::SkipTo { position: Some("3".to_string()) } ; "skipto")]
    #[test_case("%help", MusicCommand::Help ; "help")]
    #[test_case("%  play song", MusicCommand::Play { query: "song".to_string() } ; "space after prefix")]
    fn test_parse(content: &str, expected: MusicCommand) {
        assert_eq!(MusicCommand::parse(content, "%"), Some(expected));
    }

    #[test_case("hello there" ; "no prefix")]
    #[test_case("%" ; "bare prefix")]
    #[test_case("%dance" ; "unknown command")]
    #[test_case("!play song" ; "other prefix")]
    fn test_parse_ignores(content: &str) {
        assert_eq!(MusicCommand::parse(content, "%"), None);
    }

    #[test]
    fn test_parse_with_custom_prefix() {
        assert_eq!(MusicCommand::parse("!!skip", "!!"), Some(MusicCommand::Skip));
        assert_eq!(MusicCommand::parse("%skip", "!!"), None);
    }

    #[test]
    fn test_names_round_trip_through_parse() {
        for name in [
            "play", "pause", "resume", "skip", "stop", "shuffle", "volume", "queue",
            "nowplaying", "skipto", "leave", "help",
        ] {
            let command = MusicCommand::parse(&format!("%{}", name), "%").unwrap();
            assert_eq!(command.name(), name);
        }
    }
}
