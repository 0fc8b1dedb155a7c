// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use rss::extension::atom::{AtomExtension, Link};
use rss::extension::itunes::{ITunesChannelExtension, ITunesItemExtension};
use rss::{Channel, Enclosure, Guid, Image, Item};
use url::Url;

use crate::catalog::{Episode, EpisodeNumber, Show};
use crate::config::DEFAULT_FEED_LANGUAGE;
use crate::error::FeedError;

const ITUNES_NAMESPACE: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";
const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// RFC 822 date with a zero-padded day of month
const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// MIME type announced on every enclosure
pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// A show and the episodes collected for it, ready to be rendered as RSS
///
/// Episodes are kept in insertion order; rendering sorts a view of them,
/// newest first.
#[derive(Debug, Clone)]
pub struct Feed {
    show: Show,
    episodes: Vec<Episode>,
    language: String,
    link: Option<Url>,
    self_link: Option<Url>,
}

impl Feed {
    pub fn new(show: Show) -> Self {
        Self {
            show,
            episodes: Vec::new(),
            language: DEFAULT_FEED_LANGUAGE.to_string(),
            link: None,
            self_link: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Channel `<link>`; defaults to the show artwork when unset
    pub fn with_link(mut self, link: Url) -> Self {
        self.link = Some(link);
        self
    }

    /// URL the feed itself is served from, emitted as `atom:link rel="self"`
    pub fn with_self_link(mut self, self_link: Url) -> Self {
        self.self_link = Some(self_link);
        self
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Append an episode; no deduplication or ordering happens here
    pub fn add_episode(&mut self, episode: Episode) {
        self.episodes.push(episode);
    }

    /// Episodes sorted by publish date, newest first
    pub fn sorted_episodes(&self) -> Vec<&Episode> {
        let mut sorted: Vec<&Episode> = self.episodes.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
        sorted
    }

    pub fn to_channel(&self) -> Channel {
        let show = &self.show;
        let link = self.link.as_ref().unwrap_or(&show.image).to_string();

        let mut channel = Channel::default();
        channel.set_namespaces(BTreeMap::from([
            ("itunes".to_string(), ITUNES_NAMESPACE.to_string()),
            ("content".to_string(), CONTENT_NAMESPACE.to_string()),
            ("atom".to_string(), ATOM_NAMESPACE.to_string()),
        ]));
        channel.set_title(show.title.clone());
        channel.set_link(link.clone());
        channel.set_description(show.description.clone());
        channel.set_language(self.language.clone());

        let mut image = Image::default();
        image.set_url(show.image.to_string());
        image.set_title(show.title.clone());
        image.set_link(link);
        channel.set_image(image);

        let mut itunes = ITunesChannelExtension::default();
        itunes.set_author(show.author.clone());
        itunes.set_subtitle(show.description.clone());
        itunes.set_summary(show.description.clone());
        itunes.set_explicit("no".to_string());
        itunes.set_image(show.image.to_string());
        channel.set_itunes_ext(itunes);

        if let Some(self_link) = &self.self_link {
            let mut atom_link = Link::default();
            atom_link.set_href(self_link.to_string());
            atom_link.set_rel("self");
            atom_link.set_mime_type(Some("application/rss+xml".to_string()));

            let mut atom = AtomExtension::default();
            atom.set_links(vec![atom_link]);
            channel.set_atom_ext(atom);
        }

        channel.set_items(
            self.sorted_episodes()
                .into_iter()
                .map(episode_item)
                .collect::<Vec<_>>(),
        );
        channel
    }

    /// Serialize to a tab-indented RSS 2.0 document with XML declaration
    pub fn render(&self) -> Result<String, FeedError> {
        let buffer = self.to_channel().pretty_write_to(Vec::new(), b'\t', 1)?;
        Ok(String::from_utf8(buffer)?)
    }
}

fn episode_item(episode: &Episode) -> Item {
    let description = if episode.content_html.is_empty() {
        episode.summary.clone().unwrap_or_default()
    } else {
        episode.content_html.clone()
    };

    let mut item = Item::default();
    item.set_title(episode.title.clone());
    item.set_description(description.clone());
    item.set_pub_date(episode.date.format(PUB_DATE_FORMAT).to_string());
    item.set_link(episode.url.to_string());

    let mut guid = Guid::default();
    guid.set_value(episode.guid.to_string());
    guid.set_permalink(false);
    item.set_guid(guid);

    let mut enclosure = Enclosure::default();
    enclosure.set_url(episode.episode_raw_url.to_string());
    enclosure.set_mime_type(AUDIO_MIME_TYPE);
    enclosure.set_length("0");
    item.set_enclosure(enclosure);

    if !episode.content_html.is_empty() {
        item.set_content(episode.content_html.clone());
    }

    let mut itunes = ITunesItemExtension::default();
    itunes.set_author(episode.author.clone());
    itunes.set_summary(description);
    itunes.set_duration(episode.duration.clone());
    itunes.set_image(episode.image.to_string());
    if let Some(EpisodeNumber::Number(number)) = episode.number {
        itunes.set_episode(number.to_string());
    }
    item.set_itunes_ext(itunes);

    item
}
