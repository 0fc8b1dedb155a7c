// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use secrecy::SecretString;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://api-prod.ilpost.it";
pub const DEFAULT_SITE_URL: &str = "https://www.ilpost.it";
pub const DEFAULT_PODCASTS_ROUTE: &str = "podcast/v1/podcast";
pub const DEFAULT_USERS_ROUTE: &str = "user/v2";
pub const DEFAULT_FEED_LANGUAGE: &str = "it";
pub const CACHE_FILE_NAME: &str = "ilpost_cache.json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the client needs to talk to the content API.
///
/// The `Debug` impl redacts the username and password.
pub struct Settings {
    pub api_base_url: Url,
    pub site_url: Url,
    pub podcasts_route: String,
    pub users_route: String,
    pub username: SecretString,
    pub password: SecretString,
    /// Location of the persisted credential record
    pub cache_file: PathBuf,
    pub feed_language: String,
    /// Upper bound on a single boundary operation, login and paging included
    pub request_timeout: Duration,
}

impl Settings {
    /// Settings with the production endpoints and the platform cache location
    pub fn new(username: SecretString, password: SecretString) -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_BASE_URL).expect("valid default API URL"),
            site_url: Url::parse(DEFAULT_SITE_URL).expect("valid default site URL"),
            podcasts_route: DEFAULT_PODCASTS_ROUTE.to_string(),
            users_route: DEFAULT_USERS_ROUTE.to_string(),
            username,
            password,
            cache_file: default_cache_file(),
            feed_language: DEFAULT_FEED_LANGUAGE.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("site_url", &self.site_url.as_str())
            .field("podcasts_route", &self.podcasts_route)
            .field("users_route", &self.users_route)
            .field("username", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .field("cache_file", &self.cache_file)
            .field("feed_language", &self.feed_language)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Per-user config directory for the application, falling back to the
/// working directory when the platform has no home directory.
pub fn default_cache_file() -> PathBuf {
    ProjectDirs::from("", "", "postcast")
        .map(|dirs| dirs.config_dir().join(CACHE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CACHE_FILE_NAME))
}
