use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::Mutex as SerenityMutex;
use songbird::error::JoinError;
use songbird::tracks::{Track, TrackHandle};
use songbird::{Call, CoreEvent, Event, Songbird, TrackEvent};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{BotConfig, EmptyChannelPolicy};

use super::audio_sources::{AudioSource, Requester, ResolvedQuery, TrackMetadata};
use super::event_handlers::{
    DisconnectNotifier, EngineEvent, EventSender, TrackNotice, TrackNotifier,
};
use super::queue_manager::{
    ListenerAction, SessionRegistry, drain_between, empty_channel_action, shuffle_upcoming,
};

use tracing::{debug, error, info, warn};

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Audio source error: {0}")]
    AudioSourceError(String),

    #[error("No active session")]
    NoSession,

    #[error("Invalid queue position (queue has {0} tracks)")]
    InvalidPosition(usize),

    #[error("Direct jump is not supported by this engine")]
    JumpUnsupported,

    #[error("Engine call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Track control error: {0}")]
    TrackError(String),
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Everything the engine needs to start or extend a guild's session
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRequest {
    pub guild_id: GuildId,
    pub voice_channel: ChannelId,
    pub text_channel: ChannelId,
    pub query: String,
    pub requester: Requester,
}

/// Read-only view of a guild's session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub guild_id: GuildId,
    /// The first track is the one currently playing (or paused).
    pub tracks: Vec<TrackMetadata>,
    pub volume: u8,
    pub paused: bool,
    pub text_channel: ChannelId,
}

impl SessionSnapshot {
    pub fn current(&self) -> Option<&TrackMetadata> {
        self.tracks.first()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// The per-guild playback engine commands talk to
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueEngine: Send + Sync {
    /// Turn a URL or search text into tracks. Touches neither voice nor the queue.
    async fn resolve(&self, query: &str, requester: &Requester) -> MusicResult<ResolvedQuery>;

    /// Join the requested voice channel if needed and queue already resolved tracks.
    async fn enqueue(&self, request: PlayRequest, resolved: ResolvedQuery) -> MusicResult<()>;

    /// Snapshot of the guild's session, `None` when nothing is queued
    async fn session(&self, guild_id: GuildId) -> MusicResult<Option<SessionSnapshot>>;

    async fn pause(&self, guild_id: GuildId) -> MusicResult<()>;

    async fn resume(&self, guild_id: GuildId) -> MusicResult<()>;

    async fn skip(&self, guild_id: GuildId) -> MusicResult<()>;

    /// Stop playback and destroy the session
    async fn stop(&self, guild_id: GuildId) -> MusicResult<()>;

    /// Randomize every track after the current one
    async fn shuffle(&self, guild_id: GuildId) -> MusicResult<()>;

    async fn set_volume(&self, guild_id: GuildId, volume: u8) -> MusicResult<()>;

    /// Make the track at the 1-based `position` the current one, returning it.
    async fn jump(&self, guild_id: GuildId, position: usize) -> MusicResult<TrackMetadata>;

    /// Leave the guild's voice channel
    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()>;

    /// The number of non-bot members in the bot's voice channel changed.
    async fn listeners_changed(&self, guild_id: GuildId, listeners: usize) -> MusicResult<()>;
}

/// Startup settings the engine needs from the bot configuration
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub empty_channel_policy: EmptyChannelPolicy,
    pub youtube_cookies: Option<PathBuf>,
}

impl From<&BotConfig> for EngineSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            empty_channel_policy: config.empty_channel_policy,
            youtube_cookies: config.youtube_cookies.clone(),
        }
    }
}

/// Songbird-backed [`QueueEngine`].
///
/// Track order lives in songbird's builtin queue; everything else about a
/// session lives in the [`SessionRegistry`]. Clones share all state.
#[derive(Clone)]
pub struct MusicManager {
    songbird: Arc<Songbird>,
    http_client: reqwest::Client,
    sessions: SessionRegistry,
    events: EventSender,
    settings: EngineSettings,
}

fn gain(volume: u8) -> f32 {
    f32::from(volume) / 100.0
}

/// Lead time before a track ends at which songbird starts loading the next one
const PRELOAD_LEAD: Duration = Duration::from_secs(5);

/// When to start preloading a track of the given length, if it is known
fn preload_time(duration: Option<Duration>) -> Option<Duration> {
    duration.map(|duration| {
        if duration > PRELOAD_LEAD {
            duration - PRELOAD_LEAD
        } else {
            duration
        }
    })
}

/// Whether a call sitting in `current` has to (re)join `wanted`
fn needs_join(current: Option<ChannelId>, wanted: ChannelId) -> bool {
    current != Some(wanted)
}

fn metadata_of(handle: &TrackHandle) -> TrackMetadata {
    (*handle.data::<TrackMetadata>()).clone()
}

impl MusicManager {
    pub fn new(
        songbird: Arc<Songbird>,
        http_client: reqwest::Client,
        events: EventSender,
        settings: EngineSettings,
    ) -> Self {
        Self {
            songbird,
            http_client,
            sessions: SessionRegistry::new(),
            events,
            settings,
        }
    }

    /// Get the current voice channel call handle
    fn get_call(&self, guild_id: GuildId) -> MusicResult<Arc<SerenityMutex<Call>>> {
        self.songbird.get(guild_id).ok_or(MusicError::NotConnected)
    }

    /// Get the call handle for a guild that also has a live session
    fn session_call(&self, guild_id: GuildId) -> MusicResult<Arc<SerenityMutex<Call>>> {
        if !self.sessions.contains(guild_id) {
            return Err(MusicError::NoSession);
        }
        self.get_call(guild_id)
    }

    /// Join a voice channel, reusing the existing call when it is still
    /// connected there
    async fn join_channel(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> MusicResult<Arc<SerenityMutex<Call>>> {
        let existing = self.songbird.get(guild_id);
        if let Some(call) = &existing {
            let current = call
                .lock()
                .await
                .current_channel()
                .map(|channel| ChannelId::new(channel.0.get()));
            if !needs_join(current, channel_id) {
                return Ok(call.clone());
            }
            debug!(
                "Call in guild {} is in {:?}, moving to {}",
                guild_id, current, channel_id
            );
        }

        let call = self.songbird.join(guild_id, channel_id).await.map_err(|e| {
            error!(
                "Failed to join voice channel {} for guild {}: {}",
                channel_id, guild_id, e
            );
            MusicError::JoinError(e.to_string())
        })?;

        info!("Joined voice channel {} in guild {}", channel_id, guild_id);
        // Global events survive rejoins, so only a fresh call gets the notifier.
        if existing.is_some() {
            return Ok(call);
        }
        call.lock().await.add_global_event(
            Event::Core(CoreEvent::DriverDisconnect),
            DisconnectNotifier {
                manager: self.clone(),
                guild_id,
            },
        );

        Ok(call)
    }

    fn attach_notifiers(&self, guild_id: GuildId, handle: &TrackHandle) {
        for (event, notice) in [
            (TrackEvent::Play, TrackNotice::Playing),
            (TrackEvent::End, TrackNotice::Ended),
            (TrackEvent::Error, TrackNotice::Errored),
        ] {
            let notifier = TrackNotifier {
                manager: self.clone(),
                guild_id,
                notice,
            };
            if let Err(e) = handle.add_event(Event::Track(event), notifier) {
                warn!("Failed to attach {:?} notifier in guild {}: {}", notice, guild_id, e);
            }
        }
    }

    /// A queued track started (or resumed) playing
    pub(crate) fn track_playing(&self, guild_id: GuildId, handle: &TrackHandle) {
        if !self.sessions.mark_announced(guild_id, handle.uuid()) {
            return;
        }
        if let Some(session) = self.sessions.get(guild_id) {
            let track = metadata_of(handle);
            debug!("Now playing `{}` in guild {}", track.title, guild_id);
            self.events.emit(EngineEvent::TrackStarted {
                text_channel: session.text_channel,
                track,
            });
        }
    }

    /// A track left the queue. Ends the session when it was the last one.
    pub(crate) async fn track_ended(&self, guild_id: GuildId, ended: Uuid) {
        let remaining = match self.songbird.get(guild_id) {
            Some(call) => call
                .lock()
                .await
                .queue()
                .current_queue()
                .iter()
                .filter(|handle| handle.uuid() != ended)
                .count(),
            None => 0,
        };

        if remaining > 0 {
            return;
        }

        if let Some(session) = self.sessions.remove(guild_id) {
            info!("Queue finished in guild {}", guild_id);
            self.events.emit(EngineEvent::QueueFinished {
                text_channel: session.text_channel,
            });
        }
    }

    pub(crate) async fn track_errored(&self, guild_id: GuildId, handle: &TrackHandle, reason: String) {
        let track = metadata_of(handle);
        error!(
            "Track `{}` failed in guild {}: {}",
            track.title, guild_id, reason
        );
        self.events.emit(EngineEvent::Error {
            text_channel: self.sessions.get(guild_id).map(|s| s.text_channel),
            error: format!("Track `{}` failed: {}", track.title, reason),
        });
        self.track_ended(guild_id, handle.uuid()).await;
    }

    /// The voice driver dropped out of the channel
    pub(crate) async fn driver_disconnected(&self, guild_id: GuildId) {
        let Some(session) = self.sessions.remove(guild_id) else {
            return;
        };

        warn!("Voice driver disconnected in guild {}", guild_id);
        if let Some(call) = self.songbird.get(guild_id) {
            call.lock().await.queue().stop();
        }
        self.events.emit(EngineEvent::Disconnected {
            text_channel: session.text_channel,
        });
    }

    /// Leave voice in `guild_id`. A call is created first when songbird has
    /// none, so the gateway still drops the bot after a restart.
    async fn leave_channel(&self, guild_id: GuildId) -> MusicResult<()> {
        self.songbird.get_or_insert(guild_id);
        self.songbird.remove(guild_id).await.map_err(|e| match e {
            JoinError::NoCall => MusicError::NotConnected,
            other => MusicError::JoinError(other.to_string()),
        })
    }
}

#[async_trait]
impl QueueEngine for MusicManager {
    async fn resolve(&self, query: &str, requester: &Requester) -> MusicResult<ResolvedQuery> {
        AudioSource::resolve(
            &self.http_client,
            query,
            requester,
            self.settings.youtube_cookies.as_deref(),
        )
        .await
    }

    async fn enqueue(&self, request: PlayRequest, resolved: ResolvedQuery) -> MusicResult<()> {
        let guild_id = request.guild_id;
        let cookies = self.settings.youtube_cookies.as_deref();
        let call = self.join_channel(guild_id, request.voice_channel).await?;

        let (session, created) =
            self.sessions
                .get_or_create(guild_id, request.text_channel, request.voice_channel);
        if created {
            info!("Created session for guild {}", guild_id);
        } else {
            self.sessions.update(guild_id, |session| {
                session.voice_channel = request.voice_channel
            });
        }

        let (was_idle, head, queue_len) = {
            let mut handler = call.lock().await;
            let was_idle = handler.queue().is_empty();

            for metadata in &resolved.tracks {
                let input = AudioSource::input_for(&self.http_client, metadata, cookies);
                let mut track = Track::from(input).volume(gain(session.volume));
                track.user_data = Arc::new(metadata.clone());
                // Metadata is already resolved; a plain enqueue would ask yt-dlp again.
                let handle = handler.enqueue_with_preload(track, preload_time(metadata.duration));
                self.attach_notifiers(guild_id, &handle);
            }

            (was_idle, handler.queue().current(), handler.queue().len())
        };

        info!(
            "Enqueued {} track(s) for `{}` in guild {} (queue length {})",
            resolved.tracks.len(),
            request.query,
            guild_id,
            queue_len
        );

        if was_idle {
            if let Some(head) = head {
                self.track_playing(guild_id, &head);
            }
        }

        match (resolved.playlist, resolved.tracks.first()) {
            (Some(playlist), _) => self.events.emit(EngineEvent::PlaylistAdded {
                text_channel: session.text_channel,
                playlist,
                count: resolved.tracks.len(),
            }),
            (None, Some(track)) if !was_idle => self.events.emit(EngineEvent::TrackAdded {
                text_channel: session.text_channel,
                track: track.clone(),
                position: queue_len,
            }),
            _ => {}
        }

        Ok(())
    }

    async fn session(&self, guild_id: GuildId) -> MusicResult<Option<SessionSnapshot>> {
        let Some(session) = self.sessions.get(guild_id) else {
            return Ok(None);
        };
        let Some(call) = self.songbird.get(guild_id) else {
            return Ok(None);
        };

        let tracks: Vec<TrackMetadata> = call
            .lock()
            .await
            .queue()
            .current_queue()
            .iter()
            .map(metadata_of)
            .collect();

        if tracks.is_empty() {
            return Ok(None);
        }

        Ok(Some(SessionSnapshot {
            guild_id,
            tracks,
            volume: session.volume,
            paused: session.paused,
            text_channel: session.text_channel,
        }))
    }

    async fn pause(&self, guild_id: GuildId) -> MusicResult<()> {
        let call = self.session_call(guild_id)?;
        call.lock()
            .await
            .queue()
            .pause()
            .map_err(|e| MusicError::TrackError(e.to_string()))?;

        self.sessions.update(guild_id, |session| {
            session.paused = true;
            session.paused_for_empty_channel = false;
        });
        info!("Paused playback in guild {}", guild_id);
        Ok(())
    }

    async fn resume(&self, guild_id: GuildId) -> MusicResult<()> {
        let call = self.session_call(guild_id)?;
        call.lock()
            .await
            .queue()
            .resume()
            .map_err(|e| MusicError::TrackError(e.to_string()))?;

        self.sessions.update(guild_id, |session| {
            session.paused = false;
            session.paused_for_empty_channel = false;
        });
        info!("Resumed playback in guild {}", guild_id);
        Ok(())
    }

    async fn skip(&self, guild_id: GuildId) -> MusicResult<()> {
        let call = self.session_call(guild_id)?;
        call.lock()
            .await
            .queue()
            .skip()
            .map_err(|e| MusicError::TrackError(e.to_string()))?;

        self.sessions.update(guild_id, |session| session.paused = false);
        info!("Skipped track in guild {}", guild_id);
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> MusicResult<()> {
        let call = self.session_call(guild_id)?;
        // Dropping the session first keeps the end-of-track notifiers quiet.
        self.sessions.remove(guild_id);
        call.lock().await.queue().stop();
        info!("Stopped playback and cleared queue in guild {}", guild_id);
        Ok(())
    }

    async fn shuffle(&self, guild_id: GuildId) -> MusicResult<()> {
        let call = self.session_call(guild_id)?;
        call.lock().await.queue().modify_queue(shuffle_upcoming);
        info!("Shuffled queue in guild {}", guild_id);
        Ok(())
    }

    async fn set_volume(&self, guild_id: GuildId, volume: u8) -> MusicResult<()> {
        let volume = volume.min(100);
        let call = self.session_call(guild_id)?;

        for handle in call.lock().await.queue().current_queue() {
            handle
                .set_volume(gain(volume))
                .map_err(|e| MusicError::TrackError(e.to_string()))?;
        }

        self.sessions.update(guild_id, |session| session.volume = volume);
        info!("Set volume to {}% in guild {}", volume, guild_id);
        Ok(())
    }

    async fn jump(&self, guild_id: GuildId, position: usize) -> MusicResult<TrackMetadata> {
        let call = self.session_call(guild_id)?;
        let handler = call.lock().await;
        let queue = handler.queue();

        let len = queue.len();
        if position < 2 || position > len {
            return Err(MusicError::InvalidPosition(len));
        }

        let (dropped, target) = queue.modify_queue(|tracks| {
            let dropped = drain_between(tracks, position);
            let target = tracks.get(1).map(|queued| metadata_of(queued));
            (dropped, target)
        });
        let target = target.ok_or(MusicError::InvalidPosition(len))?;

        for queued in dropped {
            if let Err(e) = queued.stop() {
                debug!("Dropped track was already finished: {}", e);
            }
        }
        queue
            .skip()
            .map_err(|e| MusicError::TrackError(e.to_string()))?;

        self.sessions.update(guild_id, |session| session.paused = false);
        info!(
            "Jumped to position {} (`{}`) in guild {}",
            position, target.title, guild_id
        );
        Ok(target)
    }

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()> {
        self.sessions.remove(guild_id);
        self.leave_channel(guild_id).await?;
        info!("Left voice channel in guild {}", guild_id);
        Ok(())
    }

    async fn listeners_changed(&self, guild_id: GuildId, listeners: usize) -> MusicResult<()> {
        let Some(session) = self.sessions.get(guild_id) else {
            return Ok(());
        };
        debug!("Guild {} voice channel now has {} listener(s)", guild_id, listeners);

        match empty_channel_action(self.settings.empty_channel_policy, &session, listeners) {
            ListenerAction::Nothing => {}
            ListenerAction::Resume => {
                self.resume(guild_id).await?;
                info!("Listener returned, resumed playback in guild {}", guild_id);
            }
            ListenerAction::Stop => {
                self.sessions.remove(guild_id);
                self.events.emit(EngineEvent::QueueEmptied {
                    text_channel: session.text_channel,
                });
                if let Some(call) = self.songbird.get(guild_id) {
                    call.lock().await.queue().stop();
                }
                self.leave_channel(guild_id).await?;
                info!("Voice channel empty, left guild {}", guild_id);
            }
            ListenerAction::Pause => {
                self.get_call(guild_id)?
                    .lock()
                    .await
                    .queue()
                    .pause()
                    .map_err(|e| MusicError::TrackError(e.to_string()))?;
                self.sessions.update(guild_id, |session| {
                    session.paused = true;
                    session.paused_for_empty_channel = true;
                });
                self.events.emit(EngineEvent::QueueEmptied {
                    text_channel: session.text_channel,
                });
                info!("Voice channel empty, paused playback in guild {}", guild_id);
            }
        }

        Ok(())
    }
}
