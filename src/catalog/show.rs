// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use url::Url;

/// Editorial flags and styling attached to a show
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowMetadata {
    pub gift: bool,
    pub gift_all: bool,
    pub pushnotification: bool,
    pub chronological: i64,
    pub order: i64,
    pub robot: String,
    pub sponsored: bool,
    pub cyclicality: String,
    pub evidenza: String,
    pub cyclicalitytype: String,
    pub background_color: String,
}

/// A podcast as listed in the catalog
///
/// Two shows are the same show when their slugs match, whatever their ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub id: u64,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub image: Url,
    pub image_web: Url,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub meta: ShowMetadata,
    #[serde(default)]
    pub access_level: String,
}

impl PartialEq for Show {
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}

impl Eq for Show {}

impl Hash for Show {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slug.hash(state);
    }
}
