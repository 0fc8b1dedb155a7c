// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use futures::TryStreamExt;
use tokio::sync::OnceCell;
use tracing::info;
use url::Url;

use crate::catalog::{Episode, Show};
use crate::config::Settings;
use crate::credential::{CredentialStore, Subscription};
use crate::error::PostcastError;
use crate::feed::Feed;
use crate::fetch::Fetcher;
use crate::http::{HttpClient, build_url};
use crate::session::Session;

/// Episodes included in a feed unless the complete archive is requested
pub const FEED_EPISODE_LIMIT: usize = 20;

/// Client context shared by every boundary operation
///
/// Owns the HTTP client, the session and the show cache. The cache is filled
/// from one full catalog walk the first time a show is looked up; concurrent
/// lookups on a cold cache wait for that single walk, and a walk that fails
/// or is cancelled leaves the cache empty for the next caller.
pub struct PostcastApi<C> {
    client: C,
    session: Session,
    podcasts_url: Url,
    site_url: Url,
    feed_language: String,
    timeout: Duration,
    shows: OnceCell<HashMap<String, Show>>,
}

impl<C: HttpClient> PostcastApi<C> {
    pub fn new(client: C, settings: Settings) -> Result<Self, url::ParseError> {
        let podcasts_url = build_url(&settings.api_base_url, &[&settings.podcasts_route])?;
        let login_url = build_url(
            &settings.api_base_url,
            &[&settings.users_route, "auth", "login"],
        )?;

        let session = Session::new(
            CredentialStore::new(settings.cache_file),
            login_url,
            settings.username,
            settings.password,
        );

        Ok(Self {
            client,
            session,
            podcasts_url,
            site_url: settings.site_url,
            feed_language: settings.feed_language,
            timeout: settings.request_timeout,
            shows: OnceCell::new(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn fetcher(&self) -> Fetcher<'_, C> {
        Fetcher::new(&self.client, &self.session, &self.podcasts_url)
    }

    /// Resolve credentials up front so the subscription status is logged at startup
    pub async fn login(&self) -> Result<Option<Subscription>, PostcastError> {
        self.bounded(async {
            self.session.token(&self.client).await?;
            Ok::<_, PostcastError>(self.session.subscription().await)
        })
        .await
    }

    /// The show cache, populated on first use
    pub async fn shows(&self) -> Result<&HashMap<String, Show>, PostcastError> {
        self.bounded(self.shows.get_or_try_init(|| async {
            let shows: Vec<Show> = self.fetcher().shows(None).try_collect().await?;
            info!(count = shows.len(), "Loaded podcast catalog");
            Ok::<_, PostcastError>(
                shows
                    .into_iter()
                    .map(|show| (show.slug.clone(), show))
                    .collect(),
            )
        }))
        .await
    }

    pub async fn get_show(&self, slug: &str) -> Result<Show, PostcastError> {
        self.shows()
            .await?
            .get(slug)
            .cloned()
            .ok_or_else(|| PostcastError::NotFound(format!("Podcast '{slug}'")))
    }

    /// Shows straight from the catalog, bypassing the cache
    pub async fn list_shows(&self, limit: Option<usize>) -> Result<Vec<Show>, PostcastError> {
        let shows: Vec<Show> = self
            .bounded(async {
                Ok::<_, PostcastError>(self.fetcher().shows(limit).try_collect().await?)
            })
            .await?;

        if shows.is_empty() {
            return Err(PostcastError::NotFound("Podcasts".to_string()));
        }
        Ok(shows)
    }

    pub async fn list_episodes(
        &self,
        slug: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Episode>, PostcastError> {
        self.get_show(slug).await?;

        let episodes: Vec<Episode> = self
            .bounded(async {
                Ok::<_, PostcastError>(self.fetcher().episodes(slug, limit).try_collect().await?)
            })
            .await?;

        if episodes.is_empty() {
            return Err(PostcastError::NotFound(format!("Episodes of '{slug}'")));
        }
        Ok(episodes)
    }

    pub async fn latest_episode(&self, slug: &str) -> Result<Episode, PostcastError> {
        self.get_show(slug).await?;

        let latest = self
            .bounded(async {
                Ok::<_, PostcastError>(self.fetcher().episodes(slug, Some(1)).try_next().await?)
            })
            .await?;

        latest.ok_or_else(|| PostcastError::NotFound(format!("Episodes of '{slug}'")))
    }

    /// Build the RSS document for a show
    ///
    /// Only the latest [`FEED_EPISODE_LIMIT`] episodes are included unless
    /// `complete` is set. `self_link` is the URL the document will be served
    /// from, if known.
    pub async fn render_feed(
        &self,
        slug: &str,
        complete: bool,
        self_link: Option<Url>,
    ) -> Result<String, PostcastError> {
        let show = self.get_show(slug).await?;

        let mut feed = Feed::new(show)
            .with_language(self.feed_language.clone())
            .with_link(self.site_url.clone());
        if let Some(self_link) = self_link {
            feed = feed.with_self_link(self_link);
        }

        let limit = (!complete).then_some(FEED_EPISODE_LIMIT);
        let feed = self
            .bounded(async {
                let mut episodes = self.fetcher().episodes(slug, limit);
                while let Some(episode) = episodes.try_next().await? {
                    feed.add_episode(episode);
                }
                Ok::<_, PostcastError>(feed)
            })
            .await?;

        if feed.is_empty() {
            return Err(PostcastError::NotFound(format!("Episodes of '{slug}'")));
        }

        info!(slug, episodes = feed.len(), complete, "Rendering feed");
        Ok(feed.render()?)
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, PostcastError>
    where
        F: Future<Output = Result<T, PostcastError>>,
    {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| PostcastError::Timeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{BASE_URL, MockApi, PODCASTS_ROUTE, USERS_ROUTE};
    use secrecy::SecretString;
    use std::sync::Arc;
    use tempfile::{TempDir, tempdir};

    fn api(mock: MockApi) -> (PostcastApi<MockApi>, TempDir) {
        let dir = tempdir().unwrap();
        let mut settings = Settings::new(
            SecretString::from("user".to_string()),
            SecretString::from("pass".to_string()),
        );
        settings.api_base_url = Url::parse(BASE_URL).unwrap();
        settings.podcasts_route = PODCASTS_ROUTE.to_string();
        settings.users_route = USERS_ROUTE.to_string();
        settings.cache_file = dir.path().join("cache.json");

        (PostcastApi::new(mock, settings).unwrap(), dir)
    }

    #[tokio::test]
    async fn show_cache_is_populated_once() {
        let (api, _dir) = api(MockApi::new().with_shows(450));

        let show = api.get_show("show-449").await.unwrap();
        assert_eq!(show.id, 449);
        api.get_show("show-0").await.unwrap();
        api.get_show("show-10").await.unwrap();

        assert_eq!(api.shows().await.unwrap().len(), 450);
        assert_eq!(api.client.catalog_calls(), 3);
    }

    #[tokio::test]
    async fn concurrent_cold_lookups_share_one_catalog_walk() {
        let (api, _dir) = api(
            MockApi::new()
                .with_shows(5)
                .with_latency(Duration::from_millis(20)),
        );
        let api = Arc::new(api);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let api = api.clone();
                tokio::spawn(async move {
                    api.get_show(&format!("show-{}", i % 5)).await.map(|_| ())
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(api.client.catalog_calls(), 1);
        assert_eq!(api.client.login_calls(), 1);
    }

    #[tokio::test]
    async fn unknown_show_is_not_found() {
        let (api, _dir) = api(MockApi::new().with_shows(2));

        let error = api.get_show("nope").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn failed_population_leaves_cache_empty() {
        let (api, _dir) = api(
            MockApi::new()
                .with_shows(2)
                .with_page_failure(1, 500, "Internal Server Error"),
        );

        let error = api.get_show("show-0").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Upstream);
        assert!(api.shows.get().is_none());
    }

    #[tokio::test]
    async fn timeout_cancels_population_without_caching() {
        let (mut api, _dir) = api(
            MockApi::new()
                .with_shows(2)
                .with_latency(Duration::from_millis(200)),
        );
        api.timeout = Duration::from_millis(50);

        let error = api.get_show("show-0").await.unwrap_err();
        assert!(matches!(error, PostcastError::Timeout(_)));
        assert_eq!(error.kind(), ErrorKind::Unavailable);
        assert!(api.shows.get().is_none());
    }

    #[tokio::test]
    async fn list_shows_honours_limit() {
        let (api, _dir) = api(MockApi::new().with_shows(30));

        let shows = api.list_shows(Some(7)).await.unwrap();
        assert_eq!(shows.len(), 7);
    }

    #[tokio::test]
    async fn empty_catalog_is_not_found() {
        let (api, _dir) = api(MockApi::new());

        let error = api.list_shows(None).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn list_episodes_requires_known_show() {
        let (api, _dir) = api(
            MockApi::new()
                .with_shows(1)
                .with_episodes("show-0", 12),
        );

        let episodes = api.list_episodes("show-0", Some(5)).await.unwrap();
        assert_eq!(episodes.len(), 5);

        let error = api.list_episodes("ghost", None).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn latest_episode_is_first_in_server_order() {
        let (api, _dir) = api(
            MockApi::new()
                .with_shows(1)
                .with_episodes("show-0", 12),
        );

        let latest = api.latest_episode("show-0").await.unwrap();
        assert_eq!(latest.id, 1);

        let episode_calls: Vec<_> = api
            .client
            .page_calls()
            .into_iter()
            .filter(|call| call.scope.as_deref() == Some("show-0"))
            .collect();
        assert_eq!(episode_calls.len(), 1);
        assert_eq!(episode_calls[0].hits, 1);
    }

    #[tokio::test]
    async fn feed_is_capped_unless_complete() {
        let (api, _dir) = api(
            MockApi::new()
                .with_shows(1)
                .with_episodes("show-0", 250),
        );

        let capped = api.render_feed("show-0", false, None).await.unwrap();
        assert_eq!(capped.matches("<item>").count(), FEED_EPISODE_LIMIT);

        let complete = api.render_feed("show-0", true, None).await.unwrap();
        assert_eq!(complete.matches("<item>").count(), 250);
    }

    #[tokio::test]
    async fn feed_uses_site_link_and_language() {
        let (api, _dir) = api(
            MockApi::new()
                .with_shows(1)
                .with_episodes("show-0", 2),
        );
        let self_link = Url::parse("https://feeds.example.com/show-0/rss").unwrap();

        let xml = api
            .render_feed("show-0", false, Some(self_link))
            .await
            .unwrap();

        assert!(xml.contains("<link>https://www.ilpost.it/</link>"));
        assert!(xml.contains("<language>it</language>"));
        assert!(xml.contains(r#"href="https://feeds.example.com/show-0/rss""#));
    }

    #[tokio::test]
    async fn feed_without_episodes_is_not_found() {
        let (api, _dir) = api(
            MockApi::new()
                .with_shows(1)
                .with_episodes("show-0", 0),
        );

        let error = api.render_feed("show-0", true, None).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn rejected_login_surfaces_as_auth_failure() {
        let (api, _dir) = api(
            MockApi::new()
                .with_shows(1)
                .with_login_status(403, "Forbidden"),
        );

        let error = api.list_shows(None).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AuthenticationFailed);
        assert!(!error.to_string().contains("pass"));
    }

    #[tokio::test]
    async fn login_reports_subscription() {
        let (api, _dir) = api(MockApi::new());

        let subscription = api.login().await.unwrap().unwrap();
        assert_eq!(subscription.billing_period, "yearly");
        assert!(!api.session().is_expired().await);
    }
}
