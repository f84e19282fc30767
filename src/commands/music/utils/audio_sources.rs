//! Query resolution: turns what a user typed after `play` into track metadata
//! and, later, into playable songbird inputs. All actual lookups are delegated
//! to `yt-dlp`, either through songbird's `YoutubeDl` source or, for playlists,
//! a `--flat-playlist` subprocess.

use serde_json::Value;
use serenity::model::id::UserId;
use songbird::input::{AuxMetadata, Compose, Input, YoutubeDl};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

use super::music_manager::MusicError;

/// Result type for audio source operations
pub type AudioSourceResult<T> = Result<T, MusicError>;

/// The user who asked for a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub name: String,
}

/// Playlist a track was imported from, used for display grouping only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRef {
    pub name: String,
    pub url: String,
}

/// Represents metadata for a track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    pub title: String,
    pub url: String,
    /// `None` for live streams and sources that do not report a length.
    pub duration: Option<Duration>,
    pub thumbnail: Option<String>,
    pub requested_by: Requester,
    pub playlist: Option<PlaylistRef>,
}

impl TrackMetadata {
    /// Build metadata from what songbird's `YoutubeDl` source reports.
    pub fn from_aux(
        aux: AuxMetadata,
        fallback_url: Option<&str>,
        requested_by: Requester,
    ) -> AudioSourceResult<Self> {
        let url = aux
            .source_url
            .or_else(|| fallback_url.map(str::to_string))
            .ok_or_else(|| {
                MusicError::AudioSourceError("Resolved track has no source URL".to_string())
            })?;

        Ok(Self {
            title: aux.title.unwrap_or_else(|| "Unknown Title".to_string()),
            url,
            duration: aux.duration,
            thumbnail: aux.thumbnail,
            requested_by,
            playlist: None,
        })
    }
}

/// Everything a single `play` query expanded to
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub tracks: Vec<TrackMetadata>,
    pub playlist: Option<PlaylistRef>,
}

/// Audio source utilities for handling different types of audio inputs
pub struct AudioSource;

impl AudioSource {
    /// Check if a string is an http(s) URL
    pub fn is_url(input: &str) -> bool {
        Url::parse(input).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    }

    /// Check if a URL points at a playlist, album or set rather than one track
    pub fn is_playlist_url(input: &str) -> bool {
        let Ok(url) = Url::parse(input) else {
            return false;
        };
        let path = url.path();
        path.starts_with("/playlist") || path.starts_with("/album/") || path.contains("/sets/")
    }

    /// Resolve a query (URL or free-text search) into one or more tracks.
    pub async fn resolve(
        client: &reqwest::Client,
        query: &str,
        requester: &Requester,
        cookies: Option<&Path>,
    ) -> AudioSourceResult<ResolvedQuery> {
        if Self::is_playlist_url(query) {
            return Self::resolve_playlist(query, requester, cookies).await;
        }

        let is_url = Self::is_url(query);
        let mut source = if is_url {
            YoutubeDl::new(client.clone(), query.to_string())
        } else {
            YoutubeDl::new_search(client.clone(), query.to_string())
        }
        .user_args(Self::yt_dlp_args(cookies));

        debug!("Resolving metadata for query: {}", query);
        let aux = source.aux_metadata().await.map_err(|e| {
            MusicError::AudioSourceError(format!("Failed to resolve `{}`: {}", query, e))
        })?;

        let fallback_url = is_url.then_some(query);
        let track = TrackMetadata::from_aux(aux, fallback_url, requester.clone())?;
        info!("Resolved `{}` to `{}`", query, track.title);

        Ok(ResolvedQuery {
            tracks: vec![track],
            playlist: None,
        })
    }

    /// Create the playable input for a previously resolved track
    pub fn input_for(client: &reqwest::Client, track: &TrackMetadata, cookies: Option<&Path>) -> Input {
        YoutubeDl::new(client.clone(), track.url.clone())
            .user_args(Self::yt_dlp_args(cookies))
            .into()
    }

    fn yt_dlp_args(cookies: Option<&Path>) -> Vec<String> {
        match cookies {
            Some(path) => vec!["--cookies".to_string(), path.display().to_string()],
            None => Vec::new(),
        }
    }

    async fn resolve_playlist(
        url: &str,
        requester: &Requester,
        cookies: Option<&Path>,
    ) -> AudioSourceResult<ResolvedQuery> {
        info!("Resolving playlist: {}", url);

        let output = Command::new("yt-dlp")
            .args(["--flat-playlist", "--dump-single-json", "--no-warnings"])
            .args(Self::yt_dlp_args(cookies))
            .arg(url)
            .output()
            .await
            .map_err(|e| MusicError::AudioSourceError(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            return Err(MusicError::AudioSourceError(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Self::parse_playlist(&String::from_utf8_lossy(&output.stdout), url, requester)
    }

    /// Parse `yt-dlp --flat-playlist --dump-single-json` output.
    ///
    /// Entries without a usable URL are skipped; a playlist with no usable
    /// entries is an error.
    pub fn parse_playlist(
        json: &str,
        url: &str,
        requester: &Requester,
    ) -> AudioSourceResult<ResolvedQuery> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            MusicError::AudioSourceError(format!("Failed to parse playlist metadata: {}", e))
        })?;

        let playlist = PlaylistRef {
            name: value["title"]
                .as_str()
                .unwrap_or("Unknown Playlist")
                .to_string(),
            url: value["webpage_url"].as_str().unwrap_or(url).to_string(),
        };

        let entries = value["entries"].as_array().ok_or_else(|| {
            MusicError::AudioSourceError("Playlist metadata has no entries".to_string())
        })?;

        let tracks: Vec<TrackMetadata> = entries
            .iter()
            .filter_map(|entry| {
                Some(TrackMetadata {
                    title: entry["title"]
                        .as_str()
                        .unwrap_or("Unknown Title")
                        .to_string(),
                    url: entry_url(entry)?,
                    duration: entry["duration"]
                        .as_f64()
                        .filter(|secs| secs.is_finite() && *secs >= 0.0)
                        .map(Duration::from_secs_f64),
                    thumbnail: entry_thumbnail(entry),
                    requested_by: requester.clone(),
                    playlist: Some(playlist.clone()),
                })
            })
            .collect();

        if tracks.is_empty() {
            return Err(MusicError::AudioSourceError(format!(
                "Playlist `{}` has no playable entries",
                playlist.name
            )));
        }

        Ok(ResolvedQuery {
            tracks,
            playlist: Some(playlist),
        })
    }
}

fn entry_url(entry: &Value) -> Option<String> {
    entry["url"]
        .as_str()
        .filter(|url| AudioSource::is_url(url))
        .or_else(|| entry["webpage_url"].as_str())
        .map(str::to_string)
        .or_else(|| match entry["ie_key"].as_str() {
            Some("Youtube") => entry["id"]
                .as_str()
                .map(|id| format!("https://www.youtube.com/watch?v={}", id)),
            _ => None,
        })
}

fn entry_thumbnail(entry: &Value) -> Option<String> {
    entry["thumbnail"]
        .as_str()
        .or_else(|| {
            entry["thumbnails"]
                .as_array()
                .and_then(|thumbs| thumbs.last())
                .and_then(|thumb| thumb["url"].as_str())
        })
        .map(str::to_string)
}
