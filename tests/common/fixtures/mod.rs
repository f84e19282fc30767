//! Sample data shared by the integration tests

use std::time::Duration;

use jukebox::commands::music::Invocation;
use jukebox::commands::music::utils::audio_sources::{PlaylistRef, Requester, TrackMetadata};
use jukebox::config::{BotConfig, DEFAULT_ENGINE_TIMEOUT, EmptyChannelPolicy};
use serenity::model::id::{ChannelId, GuildId, UserId};

pub const GUILD_ID: u64 = 111;
pub const TEXT_CHANNEL_ID: u64 = 222;
pub const VOICE_CHANNEL_ID: u64 = 333;
pub const OTHER_VOICE_CHANNEL_ID: u64 = 444;
pub const USER_ID: u64 = 123456789;

pub fn guild_id() -> GuildId {
    GuildId::new(GUILD_ID)
}

pub fn text_channel() -> ChannelId {
    ChannelId::new(TEXT_CHANNEL_ID)
}

pub fn voice_channel() -> ChannelId {
    ChannelId::new(VOICE_CHANNEL_ID)
}

pub fn requester() -> Requester {
    Requester {
        id: UserId::new(USER_ID),
        name: "tester".to_string(),
    }
}

/// A track named `Track {n}` lasting `n` minutes
pub fn sample_track(n: usize) -> TrackMetadata {
    TrackMetadata {
        title: format!("Track {}", n),
        url: format!("https://www.youtube.com/watch?v=track{}", n),
        duration: Some(Duration::from_secs(60 * n as u64)),
        thumbnail: Some(format!("https://i.ytimg.com/vi/track{}/hq.jpg", n)),
        requested_by: requester(),
        playlist: None,
    }
}

pub fn sample_tracks(count: usize) -> Vec<TrackMetadata> {
    (1..=count).map(sample_track).collect()
}

pub fn sample_playlist() -> PlaylistRef {
    PlaylistRef {
        name: "Road Trip".to_string(),
        url: "https://www.youtube.com/playlist?list=PLroadtrip".to_string(),
    }
}

/// Caller and bot share the voice channel; the bot may speak there
pub fn invocation() -> Invocation {
    Invocation {
        guild_id: guild_id(),
        text_channel: text_channel(),
        requester: requester(),
        caller_voice: Some(voice_channel()),
        bot_voice: Some(voice_channel()),
        bot_can_speak: true,
    }
}

pub fn invocation_without_voice() -> Invocation {
    Invocation {
        caller_voice: None,
        ..invocation()
    }
}

pub fn config() -> BotConfig {
    BotConfig {
        token: "test-token".to_string(),
        prefix: "%".to_string(),
        youtube_cookies: None,
        empty_channel_policy: EmptyChannelPolicy::Stop,
        engine_timeout: DEFAULT_ENGINE_TIMEOUT,
    }
}
