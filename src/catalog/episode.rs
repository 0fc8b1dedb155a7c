// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize, Serializer};
use url::Url;
use uuid::Uuid;

use super::show::Show;
use super::timestamp;

/// Episode number derived from the slug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeNumber {
    /// Slugs of the form `ep-<n>-...`
    Number(u32),
    /// Weekend specials of the morning show (`morning-weekend-...`)
    Weekend,
}

impl EpisodeNumber {
    /// Parse the number out of an episode slug
    pub fn from_slug(slug: &str) -> Option<Self> {
        let mut parts = slug.split('-');
        match (parts.next(), parts.next()) {
            (Some("ep"), Some(number)) => number.parse().ok().map(Self::Number),
            (Some("morning"), Some("weekend")) => Some(Self::Weekend),
            _ => None,
        }
    }
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Weekend => f.write_str("Weekend"),
        }
    }
}

impl Serialize for EpisodeNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => serializer.serialize_u32(*n),
            Self::Weekend => serializer.serialize_str("Weekend"),
        }
    }
}

/// Episode record exactly as the catalog API sends it
#[derive(Deserialize)]
struct EpisodeRecord {
    id: u64,
    #[serde(default)]
    author: String,
    title: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    content_html: String,
    image: Url,
    image_web: Url,
    #[serde(default)]
    object: String,
    milliseconds: u64,
    #[serde(default)]
    minutes: u32,
    #[serde(default)]
    special: bool,
    share_url: Url,
    slug: String,
    full_slug: String,
    url: Url,
    episode_raw_url: Url,
    #[serde(deserialize_with = "timestamp::deserialize")]
    date: DateTime<FixedOffset>,
    #[serde(default)]
    access_level: String,
    parent: Show,
}

/// A single episode of a show
///
/// The derived fields (`guid`, `number`, `seconds`, `duration`) are computed
/// once when the record is decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "EpisodeRecord")]
pub struct Episode {
    pub id: u64,
    pub author: String,
    /// Title with HTML entities decoded
    pub title: String,
    pub summary: Option<String>,
    pub content_html: String,
    pub image: Url,
    pub image_web: Url,
    pub object: String,
    pub milliseconds: u64,
    pub minutes: u32,
    pub special: bool,
    pub share_url: Url,
    pub slug: String,
    pub full_slug: String,
    pub url: Url,
    pub episode_raw_url: Url,
    pub date: DateTime<FixedOffset>,
    pub access_level: String,
    pub parent: Show,

    pub guid: Uuid,
    pub number: Option<EpisodeNumber>,
    pub seconds: u64,
    /// Zero-padded `HH:MM:SS`
    pub duration: String,
}

impl From<EpisodeRecord> for Episode {
    fn from(record: EpisodeRecord) -> Self {
        let seconds = record.milliseconds / 1000;
        Self {
            guid: episode_guid(record.id),
            number: EpisodeNumber::from_slug(&record.slug),
            seconds,
            duration: format_duration(seconds),
            title: html_escape::decode_html_entities(&record.title).into_owned(),
            id: record.id,
            author: record.author,
            summary: record.summary,
            content_html: record.content_html,
            image: record.image,
            image_web: record.image_web,
            object: record.object,
            milliseconds: record.milliseconds,
            minutes: record.minutes,
            special: record.special,
            share_url: record.share_url,
            slug: record.slug,
            full_slug: record.full_slug,
            url: record.url,
            episode_raw_url: record.episode_raw_url,
            date: record.date,
            access_level: record.access_level,
            parent: record.parent,
        }
    }
}

/// Stable GUID for an episode id (UUIDv5 in the URL namespace)
pub fn episode_guid(id: u64) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, id.to_string().as_bytes())
}

/// Format a number of seconds as `HH:MM:SS`
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
