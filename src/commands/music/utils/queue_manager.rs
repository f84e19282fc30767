use dashmap::DashMap;
use rand::seq::SliceRandom;
use serenity::model::id::{ChannelId, GuildId};
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::EmptyChannelPolicy;

/// Volume a fresh session starts at, in percent
pub const DEFAULT_VOLUME: u8 = 50;

/// Per-guild playback state that songbird's queue does not track itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Where lifecycle announcements for this guild are sent
    pub text_channel: ChannelId,
    pub voice_channel: ChannelId,
    pub volume: u8,
    pub paused: bool,
    /// Set when playback was paused because everybody left the voice channel
    pub paused_for_empty_channel: bool,
    /// Last track a "now playing" announcement was emitted for
    pub last_announced: Option<Uuid>,
}

impl Session {
    pub fn new(text_channel: ChannelId, voice_channel: ChannelId) -> Self {
        Self {
            text_channel,
            voice_channel,
            volume: DEFAULT_VOLUME,
            paused: false,
            paused_for_empty_channel: false,
            last_announced: None,
        }
    }
}

/// Registry of live sessions, at most one per guild.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<GuildId, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the guild's session, creating it if needed.
    ///
    /// The boolean is `true` when the session was just created. An existing
    /// session keeps its bound channels.
    pub fn get_or_create(
        &self,
        guild_id: GuildId,
        text_channel: ChannelId,
        voice_channel: ChannelId,
    ) -> (Session, bool) {
        let mut created = false;
        let session = self
            .sessions
            .entry(guild_id)
            .or_insert_with(|| {
                created = true;
                Session::new(text_channel, voice_channel)
            })
            .clone();
        (session, created)
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Session> {
        self.sessions.get(&guild_id).map(|session| session.clone())
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }

    /// Mutate a session in place, returning the closure's result if it exists
    pub fn update<R>(&self, guild_id: GuildId, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.sessions.get_mut(&guild_id).map(|mut session| f(&mut session))
    }

    pub fn remove(&self, guild_id: GuildId) -> Option<Session> {
        self.sessions.remove(&guild_id).map(|(_, session)| session)
    }

    /// Record `track` as announced. Returns `false` if it already was, or if
    /// the guild has no session.
    pub fn mark_announced(&self, guild_id: GuildId, track: Uuid) -> bool {
        self.update(guild_id, |session| {
            if session.last_announced == Some(track) {
                false
            } else {
                session.last_announced = Some(track);
                true
            }
        })
        .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Shuffle every entry except the head, which is the track currently playing
pub fn shuffle_upcoming<T>(queue: &mut VecDeque<T>) {
    if queue.len() < 3 {
        return;
    }
    let upcoming = queue.make_contiguous();
    upcoming[1..].shuffle(&mut rand::rng());
}

/// Remove the entries strictly between the head and the 1-based `position`,
/// so the target becomes the next track after the head.
pub fn drain_between<T>(queue: &mut VecDeque<T>, position: usize) -> Vec<T> {
    if position < 3 || position > queue.len() {
        return Vec::new();
    }
    queue.drain(1..position - 1).collect()
}

/// What to do after the listener count in a session's voice channel changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerAction {
    Nothing,
    /// Stop, clear the queue and leave
    Stop,
    /// Pause until somebody comes back
    Pause,
    /// Undo a pause caused by the channel emptying
    Resume,
}

/// Decide how a session reacts to `listeners` humans being left with the bot.
///
/// Only a pause made because the channel emptied is undone automatically.
pub fn empty_channel_action(
    policy: EmptyChannelPolicy,
    session: &Session,
    listeners: usize,
) -> ListenerAction {
    if listeners > 0 {
        return if session.paused_for_empty_channel {
            ListenerAction::Resume
        } else {
            ListenerAction::Nothing
        };
    }

    match policy {
        EmptyChannelPolicy::Stop => ListenerAction::Stop,
        EmptyChannelPolicy::Pause if session.paused => ListenerAction::Nothing,
        EmptyChannelPolicy::Pause => ListenerAction::Pause,
    }
}
