//! Domain records held by the identity cache
//!
//! Records are built from raw JSON objects as returned by the podcast API.
//! Each record type has a matching `*Patch` with every field optional: an
//! upsert only overwrites the fields present in the payload.

use crate::error::{LibraryError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// =============================================================================
// Entity kinds
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Episode,
    Series,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Episode => "episode",
            EntityKind::Series => "series",
            EntityKind::User => "user",
        };
        f.write_str(name)
    }
}

/// A record type the identity cache can own.
pub trait CacheEntity: Send + Sync + 'static {
    const KIND: EntityKind;

    /// Partial update decoded from a raw payload.
    type Patch: DeserializeOwned;

    fn create(id: String, patch: Self::Patch) -> Self;

    /// Overwrite the fields present in `patch`.
    fn apply(&mut self, patch: Self::Patch);

    fn id(&self) -> &str;
}

/// Extract the `id` of a raw record. Numeric ids are accepted and stringified.
pub fn raw_id(raw: &Value) -> Result<String> {
    match raw.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(LibraryError::MissingId),
    }
}

// =============================================================================
// Episode
// =============================================================================

/// Podcast episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub series_title: String,
    /// Media locator; `None` means the episode cannot be played.
    pub audio_url: Option<String>,
    /// Last known position as a fraction in `[0, 1]`
    pub current_progress: f64,
    /// Display flag owned by the player. Never taken from payloads.
    pub is_playing: bool,
    pub is_bookmarked: bool,
    pub is_downloaded: bool,
    pub is_recommended: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodePatch {
    pub title: Option<String>,
    pub series_title: Option<String>,
    pub audio_url: Option<String>,
    pub current_progress: Option<f64>,
    pub is_bookmarked: Option<bool>,
    pub is_downloaded: Option<bool>,
    pub is_recommended: Option<bool>,
}

impl Episode {
    /// Playable locator, ignoring blank strings.
    pub fn media_locator(&self) -> Option<&str> {
        self.audio_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn set_progress(&mut self, progress: f64) {
        self.current_progress = clamp_fraction(progress);
    }
}

impl CacheEntity for Episode {
    const KIND: EntityKind = EntityKind::Episode;
    type Patch = EpisodePatch;

    fn create(id: String, patch: EpisodePatch) -> Self {
        let mut episode = Episode {
            id,
            title: String::new(),
            series_title: String::new(),
            audio_url: None,
            current_progress: 0.0,
            is_playing: false,
            is_bookmarked: false,
            is_downloaded: false,
            is_recommended: false,
        };
        episode.apply(patch);
        episode
    }

    fn apply(&mut self, patch: EpisodePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(series_title) = patch.series_title {
            self.series_title = series_title;
        }
        if let Some(audio_url) = patch.audio_url {
            self.audio_url = Some(audio_url);
        }
        if let Some(progress) = patch.current_progress {
            self.set_progress(progress);
        }
        if let Some(flag) = patch.is_bookmarked {
            self.is_bookmarked = flag;
        }
        if let Some(flag) = patch.is_downloaded {
            self.is_downloaded = flag;
        }
        if let Some(flag) = patch.is_recommended {
            self.is_recommended = flag;
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Series
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: String,
    pub title: String,
    pub author: String,
    pub num_episodes: u32,
    pub is_subscribed: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub num_episodes: Option<u32>,
    pub is_subscribed: Option<bool>,
}

impl CacheEntity for Series {
    const KIND: EntityKind = EntityKind::Series;
    type Patch = SeriesPatch;

    fn create(id: String, patch: SeriesPatch) -> Self {
        let mut series = Series {
            id,
            title: String::new(),
            author: String::new(),
            num_episodes: 0,
            is_subscribed: false,
        };
        series.apply(patch);
        series
    }

    fn apply(&mut self, patch: SeriesPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(author) = patch.author {
            self.author = author;
        }
        if let Some(count) = patch.num_episodes {
            self.num_episodes = count;
        }
        if let Some(flag) = patch.is_subscribed {
            self.is_subscribed = flag;
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl CacheEntity for User {
    const KIND: EntityKind = EntityKind::User;
    type Patch = UserPatch;

    fn create(id: String, patch: UserPatch) -> Self {
        let mut user = User {
            id,
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
        };
        user.apply(patch);
        user
    }

    fn apply(&mut self, patch: UserPatch) {
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
}

fn clamp_fraction(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
