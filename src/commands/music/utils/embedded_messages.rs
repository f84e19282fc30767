use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use serenity::all::{CreateEmbed, CreateEmbedFooter, Timestamp};

use super::{
    audio_sources::{PlaylistRef, TrackMetadata},
    format_optional_duration,
};

pub const EMBED_COLOR: u32 = 0x0099ff;
pub const ERROR_COLOR: u32 = 0xff0000;
pub const SUCCESS_COLOR: u32 = 0x00ff00;

// Guard failures
pub const NOT_IN_VOICE: &str = "You need to be in a voice channel to use this command!";
pub const NO_PERMISSION: &str = "I need permissions to join and speak in your voice channel!";
pub const NOTHING_PLAYING: &str = "Nothing is playing right now!";
pub const BOT_NOT_IN_VOICE: &str = "I am not connected to any voice channel!";
pub const NOT_SAME_CHANNEL: &str = "You need to be in the same voice channel as me!";

// Argument failures
pub const MISSING_QUERY: &str = "Please provide a song name or URL!";
pub const INVALID_VOLUME: &str = "Please provide a valid volume between 0 and 100!";
pub const INVALID_POSITION: &str = "Please provide a valid position number!";
pub const ALREADY_PLAYING: &str = "That song is already playing!";

// Command outcomes
pub const PAUSED: &str = "⏸️ Paused the music!";
pub const RESUMED: &str = "▶️ Resumed the music!";
pub const SKIPPED: &str = "⏭️ Skipped the current song!";
pub const STOPPED: &str = "⏹️ Stopped the music and cleared the queue!";
pub const SHUFFLED: &str = "🔀 Shuffled the queue!";
pub const LEFT: &str = "👋 Successfully left the voice channel!";

pub const PLAY_FAILED: &str = "An error occurred while trying to play the song.";
pub const PAUSE_FAILED: &str = "An error occurred while pausing the music.";
pub const RESUME_FAILED: &str = "An error occurred while resuming the music.";
pub const SKIP_FAILED: &str = "An error occurred while skipping the song.";
pub const STOP_FAILED: &str = "An error occurred while stopping the music.";
pub const SHUFFLE_FAILED: &str = "An error occurred while shuffling the queue.";
pub const VOLUME_FAILED: &str = "An error occurred while changing the volume.";
pub const SKIPTO_FAILED: &str = "An error occurred while skipping to the song.";
pub const LEAVE_FAILED: &str = "An error occurred while trying to leave the voice channel.";
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred while executing this command.";
pub const TAKING_TOO_LONG: &str =
    "⏳ This is taking longer than expected. Please try again in a moment.";
pub const PLAYER_ERROR: &str = "An error occurred with the music player.";

/// A single embed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// The display payload every reply and announcement is built from.
///
/// Kept free of serenity types so handlers can be tested by value; it is
/// turned into a [`CreateEmbed`] only when sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<CardField>,
    pub thumbnail: Option<String>,
    pub footer: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Card {
    pub fn new(title: impl Into<String>, description: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            color,
            fields: Vec::new(),
            thumbnail: None,
            footer: None,
            timestamp: Utc::now(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(CardField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn thumbnail(mut self, url: Option<String>) -> Self {
        self.thumbnail = url;
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    /// Value of the first field with the given name
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }
}

impl From<Card> for CreateEmbed {
    fn from(card: Card) -> Self {
        let mut embed = CreateEmbed::new()
            .title(card.title)
            .description(card.description)
            .color(card.color)
            .fields(
                card.fields
                    .into_iter()
                    .map(|field| (field.name, field.value, field.inline)),
            );

        if let Some(url) = card.thumbnail {
            embed = embed.thumbnail(url);
        }
        if let Some(text) = card.footer {
            embed = embed.footer(CreateEmbedFooter::new(text));
        }
        if let Ok(timestamp) = Timestamp::from_unix_timestamp(card.timestamp.timestamp()) {
            embed = embed.timestamp(timestamp);
        }

        embed
    }
}

/// Create an error embed with the standard title and color
pub fn error_card(message: impl Into<String>) -> Card {
    Card::new("❌ Error", message, ERROR_COLOR)
}

/// Create a success embed with the standard title and color
pub fn success_card(message: impl Into<String>) -> Card {
    Card::new("✅ Success", message, SUCCESS_COLOR)
}

fn track_link(track: &TrackMetadata) -> String {
    format!("[{}]({})", track.title, track.url)
}

fn duration_field(track: &TrackMetadata) -> String {
    format_optional_duration(track.duration)
}

/// Durations inside queue lines are set in code spans
fn duration_code(track: &TrackMetadata) -> String {
    format!("`{}`", duration_field(track))
}

/// Create an embed for when a song starts playing
pub fn now_playing(track: &TrackMetadata) -> Card {
    Card::new("🎵 Now Playing", track_link(track), EMBED_COLOR)
        .field("Duration", duration_field(track), true)
        .field("Requested by", track.requested_by.name.clone(), true)
        .thumbnail(track.thumbnail.clone())
}

/// Create the `nowplaying` reply, which also shows session state
pub fn now_playing_detail(track: &TrackMetadata, volume: u8, paused: bool) -> Card {
    let mut card = now_playing(track).field("Volume", format!("{}%", volume), true);
    if paused {
        card = card.field("Status", "⏸️ Paused", true);
    }
    if let Some(playlist) = &track.playlist {
        card = card.field("Playlist", format!("[{}]({})", playlist.name, playlist.url), false);
    }
    card
}

/// Create an embed for when a song is added to the queue
pub fn added_to_queue(track: &TrackMetadata, position: usize) -> Card {
    Card::new("✅ Added to Queue", track_link(track), SUCCESS_COLOR)
        .field("Duration", duration_field(track), true)
        .field("Position in queue", position.to_string(), true)
        .thumbnail(track.thumbnail.clone())
}

/// Create an embed for when a whole playlist is imported
pub fn playlist_added(playlist: &PlaylistRef, count: usize) -> Card {
    Card::new(
        "📋 Playlist Added",
        format!("Added **{}** playlist ({} songs) to queue", playlist.name, count),
        SUCCESS_COLOR,
    )
}

/// Create one page of the queue listing.
///
/// `page` is 1-based and must already be validated against `page_size`.
pub fn queue_page(tracks: &[TrackMetadata], page: usize, page_size: usize) -> Card {
    let total_pages = tracks.len().div_ceil(page_size).max(1);
    let start = (page - 1) * page_size;

    let description = tracks
        .iter()
        .enumerate()
        .skip(start)
        .take(page_size)
        .map(|(index, track)| {
            let line = format!("{} - {}", track_link(track), duration_code(track));
            if index == 0 {
                format!("**Now Playing:** {}", line)
            } else {
                format!("{}. {}", index + 1, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    Card::new("🎵 Current Queue", description, EMBED_COLOR).footer(format!(
        "Page {}/{} • Total songs: {}",
        page,
        total_pages,
        tracks.len()
    ))
}

/// Create the `skipto` reply for the track that is now playing
pub fn skipped_to(track: &TrackMetadata, position: usize) -> Card {
    Card::new("⏭️ Skipped to Song", track_link(track), EMBED_COLOR)
        .field("Position", format!("`#{}`", position), true)
        .field("Duration", duration_code(track), true)
        .thumbnail(track.thumbnail.clone())
}

pub fn invalid_page(total_pages: usize) -> Card {
    error_card(format!(
        "Invalid page number! Please choose a page between 1 and {}.",
        total_pages
    ))
}

pub fn position_out_of_range(queue_length: usize) -> Card {
    error_card(format!(
        "Invalid position! The queue only has {} songs.",
        queue_length
    ))
}

pub fn volume_set(volume: u8) -> Card {
    success_card(format!("🔊 Set volume to {}%", volume))
}

/// Create the static command listing
pub fn help(prefix: &str) -> Card {
    const COMMANDS: [(&str, &str); 12] = [
        ("play <song name or URL>", "Play a song or add it to the queue"),
        ("pause", "Pause the current song"),
        ("resume", "Resume the paused song"),
        ("skip", "Skip the current song"),
        ("stop", "Stop the music and clear the queue"),
        ("shuffle", "Shuffle the upcoming songs"),
        ("volume <0-100>", "Set the playback volume"),
        ("queue [page]", "Show the queue"),
        ("nowplaying", "Show the current song (alias: np)"),
        ("skipto <position>", "Skip to a position in the queue"),
        ("leave", "Leave the voice channel"),
        ("help", "Show this message"),
    ];

    COMMANDS.iter().fold(
        Card::new("🎵 Music Bot Commands", "Here are all available commands:", EMBED_COLOR),
        |card, (usage, description)| card.field(format!("{}{}", prefix, usage), *description, false),
    )
}

pub fn goodbye() -> Card {
    Card::new(
        "👋 Goodbye",
        "Voice channel is empty. Leaving the channel...",
        EMBED_COLOR,
    )
}

pub fn queue_paused_empty() -> Card {
    Card::new(
        "⏸️ Queue Paused",
        "Queue paused because there is no one in the channel.",
        EMBED_COLOR,
    )
}

pub fn queue_finished() -> Card {
    Card::new("🎵 Queue Finished", "All songs have been played!", EMBED_COLOR)
}

pub fn disconnected() -> Card {
    Card::new(
        "👋 Disconnected",
        "Bot disconnected from the voice channel.",
        EMBED_COLOR,
    )
}

pub fn player_error() -> Card {
    error_card(PLAYER_ERROR)
}

pub fn taking_too_long() -> Card {
    error_card(TAKING_TOO_LONG)
}
