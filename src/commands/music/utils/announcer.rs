//! Renders engine lifecycle events into the session's text channel.

use std::sync::Arc;

use poise::serenity_prelude as serenity;
use serenity::all::{CreateMessage, Http};
use serenity::async_trait;
use serenity::model::id::ChannelId;
use tracing::{error, warn};

use crate::Error;
use crate::config::EmptyChannelPolicy;

use super::audio_sources::{PlaylistRef, TrackMetadata};
use super::embedded_messages::{self, Card};
use super::event_handlers::PlaybackEvents;

/// Somewhere cards can be posted
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Announce: Send + Sync {
    async fn announce(&self, channel: ChannelId, card: Card) -> Result<(), Error>;
}

/// Posts cards through the Discord HTTP API
pub struct HttpAnnouncer {
    http: Arc<Http>,
}

impl HttpAnnouncer {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Announce for HttpAnnouncer {
    async fn announce(&self, channel: ChannelId, card: Card) -> Result<(), Error> {
        channel
            .send_message(&self.http, CreateMessage::new().embed(card.into()))
            .await?;
        Ok(())
    }
}

/// [`PlaybackEvents`] subscriber that announces every event as a card
pub struct EventBridge<A> {
    announcer: A,
    empty_channel_policy: EmptyChannelPolicy,
}

impl<A: Announce> EventBridge<A> {
    pub fn new(announcer: A, empty_channel_policy: EmptyChannelPolicy) -> Self {
        Self {
            announcer,
            empty_channel_policy,
        }
    }

    async fn send(&self, channel: ChannelId, card: Card) {
        let title = card.title.clone();
        if let Err(e) = self.announcer.announce(channel, card).await {
            warn!("Failed to announce `{}` in channel {}: {}", title, channel, e);
        }
    }
}

#[async_trait]
impl<A: Announce> PlaybackEvents for EventBridge<A> {
    async fn track_started(&self, text_channel: ChannelId, track: &TrackMetadata) {
        self.send(text_channel, embedded_messages::now_playing(track))
            .await;
    }

    async fn track_added(&self, text_channel: ChannelId, track: &TrackMetadata, position: usize) {
        self.send(text_channel, embedded_messages::added_to_queue(track, position))
            .await;
    }

    async fn playlist_added(&self, text_channel: ChannelId, playlist: &PlaylistRef, count: usize) {
        self.send(text_channel, embedded_messages::playlist_added(playlist, count))
            .await;
    }

    async fn queue_emptied(&self, text_channel: ChannelId) {
        let card = match self.empty_channel_policy {
            EmptyChannelPolicy::Stop => embedded_messages::goodbye(),
            EmptyChannelPolicy::Pause => embedded_messages::queue_paused_empty(),
        };
        self.send(text_channel, card).await;
    }

    async fn queue_finished(&self, text_channel: ChannelId) {
        self.send(text_channel, embedded_messages::queue_finished())
            .await;
    }

    async fn disconnected(&self, text_channel: ChannelId) {
        self.send(text_channel, embedded_messages::disconnected())
            .await;
    }

    async fn error(&self, text_channel: Option<ChannelId>, error: &str) {
        error!("Music player error: {}", error);
        if let Some(channel) = text_channel {
            self.send(channel, embedded_messages::player_error()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(EmptyChannelPolicy::Stop, "👋 Goodbye")]
    #[case(EmptyChannelPolicy::Pause, "⏸️ Queue Paused")]
    #[tokio::test]
    async fn test_queue_emptied_card_follows_policy(
        #[case] policy: EmptyChannelPolicy,
        #[case] title: &'static str,
    ) {
        let mut announcer = MockAnnounce::new();
        announcer
            .expect_announce()
            .withf(move |channel, card| *channel == ChannelId::new(8) && card.title == title)
            .times(1)
            .returning(|_, _| Ok(()));

        EventBridge::new(announcer, policy)
            .queue_emptied(ChannelId::new(8))
            .await;
    }

    #[tokio::test]
    async fn test_error_without_channel_is_only_logged() {
        let mut announcer = MockAnnounce::new();
        announcer.expect_announce().never();

        EventBridge::new(announcer, EmptyChannelPolicy::Stop)
            .error(None, "decoder exploded")
            .await;
    }

    #[tokio::test]
    async fn test_error_card_hides_the_cause() {
        let mut announcer = MockAnnounce::new();
        announcer
            .expect_announce()
            .withf(|channel, card| {
                *channel == ChannelId::new(2)
                    && card.description == "An error occurred with the music player."
                    && !card.description.contains("decoder")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        EventBridge::new(announcer, EmptyChannelPolicy::Stop)
            .error(Some(ChannelId::new(2)), "decoder exploded")
            .await;
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let mut announcer = MockAnnounce::new();
        announcer
            .expect_announce()
            .times(1)
            .returning(|_, _| Err("missing access".into()));

        EventBridge::new(announcer, EmptyChannelPolicy::Stop)
            .queue_finished(ChannelId::new(3))
            .await;
    }
}
