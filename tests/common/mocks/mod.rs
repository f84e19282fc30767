//! Engine doubles for the command tests.
//!
//! `MockEngine` is a strict mockall mock: any call without an expectation
//! panics, which is how tests assert that no engine call happened.
//! `FakeEngine` is a small in-memory engine for tests that care about the
//! resulting session state rather than the exact calls.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use serenity::model::id::{ChannelId, GuildId};

use jukebox::commands::music::utils::audio_sources::{Requester, ResolvedQuery, TrackMetadata};
use jukebox::commands::music::utils::music_manager::{
    MusicError, MusicResult, PlayRequest, QueueEngine, SessionSnapshot,
};

mock! {
    pub Engine {}

    #[async_trait]
    impl QueueEngine for Engine {
        async fn resolve(&self, query: &str, requester: &Requester) -> MusicResult<ResolvedQuery>;
        async fn enqueue(&self, request: PlayRequest, resolved: ResolvedQuery) -> MusicResult<()>;
        async fn session(&self, guild_id: GuildId) -> MusicResult<Option<SessionSnapshot>>;
        async fn pause(&self, guild_id: GuildId) -> MusicResult<()>;
        async fn resume(&self, guild_id: GuildId) -> MusicResult<()>;
        async fn skip(&self, guild_id: GuildId) -> MusicResult<()>;
        async fn stop(&self, guild_id: GuildId) -> MusicResult<()>;
        async fn shuffle(&self, guild_id: GuildId) -> MusicResult<()>;
        async fn set_volume(&self, guild_id: GuildId, volume: u8) -> MusicResult<()>;
        async fn jump(&self, guild_id: GuildId, position: usize) -> MusicResult<TrackMetadata>;
        async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()>;
        async fn listeners_changed(&self, guild_id: GuildId, listeners: usize) -> MusicResult<()>;
    }
}

#[derive(Debug, Clone)]
struct FakeSession {
    tracks: Vec<TrackMetadata>,
    volume: u8,
    paused: bool,
    text_channel: ChannelId,
}

/// In-memory engine that keeps one session per guild
#[derive(Default)]
pub struct FakeEngine {
    sessions: Mutex<HashMap<GuildId, FakeSession>>,
    calls: Mutex<Vec<String>>,
    /// When false, `jump` reports [`MusicError::JumpUnsupported`]
    pub supports_jump: bool,
    /// Every call sleeps this long before doing anything
    pub latency: Option<Duration>,
    /// Extra time `enqueue` takes, on top of `latency`
    pub enqueue_latency: Option<Duration>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            supports_jump: true,
            ..Self::default()
        }
    }

    /// Start a session for `guild_id` with the given tracks at volume 50
    pub fn with_session(self, guild_id: GuildId, text_channel: ChannelId, tracks: Vec<TrackMetadata>) -> Self {
        self.sessions.lock().unwrap().insert(
            guild_id,
            FakeSession {
                tracks,
                volume: 50,
                paused: false,
                text_channel,
            },
        );
        self
    }

    pub fn without_jump(mut self) -> Self {
        self.supports_jump = false;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_enqueue_latency(mut self, latency: Duration) -> Self {
        self.enqueue_latency = Some(latency);
        self
    }

    /// Names of the calls made so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn volume(&self, guild_id: GuildId) -> Option<u8> {
        self.sessions.lock().unwrap().get(&guild_id).map(|s| s.volume)
    }

    pub fn titles(&self, guild_id: GuildId) -> Vec<String> {
        self.sessions
            .lock()
            .unwrap()
            .get(&guild_id)
            .map(|s| s.tracks.iter().map(|t| t.title.clone()).collect())
            .unwrap_or_default()
    }

    pub fn has_session(&self, guild_id: GuildId) -> bool {
        self.sessions.lock().unwrap().contains_key(&guild_id)
    }

    async fn enter(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn with_existing<T>(
        &self,
        guild_id: GuildId,
        f: impl FnOnce(&mut FakeSession) -> MusicResult<T>,
    ) -> MusicResult<T> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(&guild_id).ok_or(MusicError::NoSession)?;
        f(session)
    }
}

#[async_trait]
impl QueueEngine for FakeEngine {
    async fn resolve(&self, query: &str, requester: &Requester) -> MusicResult<ResolvedQuery> {
        self.enter("resolve").await;
        Ok(ResolvedQuery {
            tracks: vec![TrackMetadata {
                title: query.to_string(),
                url: format!("https://example.com/{}", query.replace(' ', "_")),
                duration: None,
                thumbnail: None,
                requested_by: requester.clone(),
                playlist: None,
            }],
            playlist: None,
        })
    }

    async fn enqueue(&self, request: PlayRequest, resolved: ResolvedQuery) -> MusicResult<()> {
        self.enter("enqueue").await;
        if let Some(latency) = self.enqueue_latency {
            tokio::time::sleep(latency).await;
        }
        self.sessions
            .lock()
            .unwrap()
            .entry(request.guild_id)
            .or_insert_with(|| FakeSession {
                tracks: Vec::new(),
                volume: 50,
                paused: false,
                text_channel: request.text_channel,
            })
            .tracks
            .extend(resolved.tracks);
        Ok(())
    }

    async fn session(&self, guild_id: GuildId) -> MusicResult<Option<SessionSnapshot>> {
        self.enter("session").await;
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(&guild_id)
            .map(|s| SessionSnapshot {
                guild_id,
                tracks: s.tracks.clone(),
                volume: s.volume,
                paused: s.paused,
                text_channel: s.text_channel,
            }))
    }

    async fn pause(&self, guild_id: GuildId) -> MusicResult<()> {
        self.enter("pause").await;
        self.with_existing(guild_id, |s| {
            s.paused = true;
            Ok(())
        })
    }

    async fn resume(&self, guild_id: GuildId) -> MusicResult<()> {
        self.enter("resume").await;
        self.with_existing(guild_id, |s| {
            s.paused = false;
            Ok(())
        })
    }

    async fn skip(&self, guild_id: GuildId) -> MusicResult<()> {
        self.enter("skip").await;
        self.with_existing(guild_id, |s| {
            if !s.tracks.is_empty() {
                s.tracks.remove(0);
            }
            Ok(())
        })
    }

    async fn stop(&self, guild_id: GuildId) -> MusicResult<()> {
        self.enter("stop").await;
        self.sessions
            .lock()
            .unwrap()
            .remove(&guild_id)
            .map(|_| ())
            .ok_or(MusicError::NoSession)
    }

    async fn shuffle(&self, guild_id: GuildId) -> MusicResult<()> {
        self.enter("shuffle").await;
        self.with_existing(guild_id, |s| {
            if s.tracks.len() > 2 {
                s.tracks[1..].reverse();
            }
            Ok(())
        })
    }

    async fn set_volume(&self, guild_id: GuildId, volume: u8) -> MusicResult<()> {
        self.enter("set_volume").await;
        self.with_existing(guild_id, |s| {
            s.volume = volume;
            Ok(())
        })
    }

    async fn jump(&self, guild_id: GuildId, position: usize) -> MusicResult<TrackMetadata> {
        self.enter("jump").await;
        if !self.supports_jump {
            return Err(MusicError::JumpUnsupported);
        }
        self.with_existing(guild_id, |s| {
            if position < 2 || position > s.tracks.len() {
                return Err(MusicError::InvalidPosition(s.tracks.len()));
            }
            s.tracks.drain(..position - 1);
            Ok(s.tracks[0].clone())
        })
    }

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()> {
        self.enter("disconnect").await;
        self.sessions.lock().unwrap().remove(&guild_id);
        Ok(())
    }

    async fn listeners_changed(&self, _guild_id: GuildId, _listeners: usize) -> MusicResult<()> {
        self.enter("listeners_changed").await;
        Ok(())
    }
}
