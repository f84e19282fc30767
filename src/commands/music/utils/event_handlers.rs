use std::sync::Arc;

use poise::serenity_prelude as serenity;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::tracks::PlayMode;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::audio_sources::{PlaylistRef, TrackMetadata};
use super::music_manager::MusicManager;

/// Lifecycle events the engine reports back to the chat surface
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    TrackStarted {
        text_channel: ChannelId,
        track: TrackMetadata,
    },
    TrackAdded {
        text_channel: ChannelId,
        track: TrackMetadata,
        /// 1-based position, equal to the queue length after the add
        position: usize,
    },
    PlaylistAdded {
        text_channel: ChannelId,
        playlist: PlaylistRef,
        count: usize,
    },
    QueueEmptied {
        text_channel: ChannelId,
    },
    QueueFinished {
        text_channel: ChannelId,
    },
    Disconnected {
        text_channel: ChannelId,
    },
    Error {
        text_channel: Option<ChannelId>,
        error: String,
    },
}

impl EngineEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TrackStarted { .. } => "track_started",
            Self::TrackAdded { .. } => "track_added",
            Self::PlaylistAdded { .. } => "playlist_added",
            Self::QueueEmptied { .. } => "queue_emptied",
            Self::QueueFinished { .. } => "queue_finished",
            Self::Disconnected { .. } => "disconnected",
            Self::Error { .. } => "error",
        }
    }
}

/// Sending half of the engine event channel
#[derive(Debug, Clone)]
pub struct EventSender(mpsc::UnboundedSender<EngineEvent>);

pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender(tx), rx)
}

impl EventSender {
    pub fn emit(&self, event: EngineEvent) {
        let kind = event.kind();
        if self.0.send(event).is_err() {
            warn!("Dropped `{}` event: event pump is not running", kind);
        }
    }
}

/// Subscriber for engine lifecycle events, one method per event kind
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaybackEvents: Send + Sync {
    async fn track_started(&self, text_channel: ChannelId, track: &TrackMetadata);

    async fn track_added(&self, text_channel: ChannelId, track: &TrackMetadata, position: usize);

    async fn playlist_added(&self, text_channel: ChannelId, playlist: &PlaylistRef, count: usize);

    async fn queue_emptied(&self, text_channel: ChannelId);

    async fn queue_finished(&self, text_channel: ChannelId);

    async fn disconnected(&self, text_channel: ChannelId);

    async fn error(&self, text_channel: Option<ChannelId>, error: &str);
}

/// Route one event to the matching subscriber method
pub async fn deliver(handler: &dyn PlaybackEvents, event: EngineEvent) {
    match event {
        EngineEvent::TrackStarted {
            text_channel,
            track,
        } => handler.track_started(text_channel, &track).await,
        EngineEvent::TrackAdded {
            text_channel,
            track,
            position,
        } => handler.track_added(text_channel, &track, position).await,
        EngineEvent::PlaylistAdded {
            text_channel,
            playlist,
            count,
        } => handler.playlist_added(text_channel, &playlist, count).await,
        EngineEvent::QueueEmptied { text_channel } => handler.queue_emptied(text_channel).await,
        EngineEvent::QueueFinished { text_channel } => handler.queue_finished(text_channel).await,
        EngineEvent::Disconnected { text_channel } => handler.disconnected(text_channel).await,
        EngineEvent::Error {
            text_channel,
            error,
        } => handler.error(text_channel, &error).await,
    }
}

/// Drain the event channel, handling one event at a time until every sender is gone.
pub async fn run_event_pump(mut events: EventReceiver, handler: Arc<dyn PlaybackEvents>) {
    info!("Event pump started");
    while let Some(event) = events.recv().await {
        debug!("Delivering `{}` event", event.kind());
        deliver(handler.as_ref(), event).await;
    }
    info!("Event pump stopped");
}

/// Which track lifecycle change a [`TrackNotifier`] reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackNotice {
    Playing,
    Ended,
    Errored,
}

/// Songbird track event handler that forwards to the engine
pub struct TrackNotifier {
    pub manager: MusicManager,
    pub guild_id: GuildId,
    pub notice: TrackNotice,
}

#[async_trait]
impl songbird::EventHandler for TrackNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        let songbird::EventContext::Track(tracks) = ctx else {
            return None;
        };

        for (state, handle) in tracks.iter() {
            match self.notice {
                TrackNotice::Playing => self.manager.track_playing(self.guild_id, handle),
                TrackNotice::Ended => self.manager.track_ended(self.guild_id, handle.uuid()).await,
                TrackNotice::Errored => {
                    let reason = match &state.playing {
                        PlayMode::Errored(e) => format!("{:?}", e),
                        other => format!("unexpected state {:?}", other),
                    };
                    self.manager
                        .track_errored(self.guild_id, handle, reason)
                        .await
                }
            }
        }

        None
    }
}

/// Songbird driver event handler for losing the voice connection
pub struct DisconnectNotifier {
    pub manager: MusicManager,
    pub guild_id: GuildId,
}

#[async_trait]
impl songbird::EventHandler for DisconnectNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::DriverDisconnect(data) = ctx {
            debug!(
                "Driver disconnect in guild {}: kind {:?}, reason {:?}",
                self.guild_id, data.kind, data.reason
            );
            self.manager.driver_disconnected(self.guild_id).await;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::music::utils::audio_sources::Requester;
    use mockall::predicate::eq;
    use super::serenity::model::id::UserId;

    fn track() -> TrackMetadata {
        TrackMetadata {
            title: "song".to_string(),
            url: "https://example.com/song".to_string(),
            duration: None,
            thumbnail: None,
            requested_by: Requester {
                id: UserId::new(9),
                name: "carol".to_string(),
            },
            playlist: None,
        }
    }

    #[tokio::test]
    async fn test_deliver_routes_each_kind() {
        let channel_id = ChannelId::new(5);
        let mut handler = MockPlaybackEvents::new();
        handler
            .expect_track_started()
            .withf(move |channel, t| *channel == channel_id && t.title == "song")
            .times(1)
            .return_const(());
        handler
            .expect_track_added()
            .withf(move |channel, _, position| *channel == channel_id && *position == 3)
            .times(1)
            .return_const(());
        handler
            .expect_queue_finished()
            .with(eq(channel_id))
            .times(1)
            .return_const(());
        handler
            .expect_error()
            .withf(|channel, error| channel.is_none() && error == "boom")
            .times(1)
            .return_const(());

        deliver(
            &handler,
            EngineEvent::TrackStarted {
                text_channel: channel_id,
                track: track(),
            },
        )
        .await;
        deliver(
            &handler,
            EngineEvent::TrackAdded {
                text_channel: channel_id,
                track: track(),
                position: 3,
            },
        )
        .await;
        deliver(&handler, EngineEvent::QueueFinished { text_channel: channel_id }).await;
        deliver(
            &handler,
            EngineEvent::Error {
                text_channel: None,
                error: "boom".to_string(),
            },
        )
        .await;
    }

    #[tokio::test]
    async fn test_pump_handles_events_in_order_and_stops_when_senders_drop() {
        let (tx, rx) = channel();
        let mut handler = MockPlaybackEvents::new();
        let mut seq = mockall::Sequence::new();
        handler
            .expect_queue_emptied()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        handler
            .expect_disconnected()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        tx.emit(EngineEvent::QueueEmptied {
            text_channel: ChannelId::new(1),
        });
        tx.emit(EngineEvent::Disconnected {
            text_channel: ChannelId::new(1),
        });
        drop(tx);

        run_event_pump(rx, Arc::new(handler)).await;
    }

    #[test]
    fn test_emit_without_pump_does_not_panic() {
        let (tx, rx) = channel();
        drop(rx);
        tx.emit(EngineEvent::QueueFinished {
            text_channel: ChannelId::new(1),
        });
    }
}
