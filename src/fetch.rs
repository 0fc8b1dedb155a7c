// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::VecDeque;

use futures::stream::{self, BoxStream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::catalog::{Episode, Show};
use crate::error::FetchError;
use crate::http::{HttpClient, build_url};
use crate::session::Session;

/// Page size used when the caller sets no limit
pub const PAGE_SIZE: usize = 200;

#[derive(Deserialize)]
struct Envelope<T> {
    head: EnvelopeHead,
    data: Vec<T>,
}

#[derive(Deserialize)]
struct EnvelopeHead {
    data: EnvelopeTotals,
}

#[derive(Deserialize)]
struct EnvelopeTotals {
    total: usize,
}

/// Walks the paginated podcast endpoints of the catalog API.
///
/// Every call returns a fresh, lazy stream: no request is made until the
/// stream is polled, and dropping it cancels the page fetch in flight.
pub struct Fetcher<'a, C> {
    client: &'a C,
    session: &'a Session,
    podcasts_url: &'a Url,
}

impl<'a, C: HttpClient> Fetcher<'a, C> {
    pub fn new(client: &'a C, session: &'a Session, podcasts_url: &'a Url) -> Self {
        Self {
            client,
            session,
            podcasts_url,
        }
    }

    /// All shows in the catalog, up to `limit`
    pub fn shows(self, limit: Option<usize>) -> BoxStream<'a, Result<Show, FetchError>> {
        self.fetch(None, limit)
    }

    /// Episodes of one show in server order (newest first), up to `limit`
    pub fn episodes(
        self,
        slug: &str,
        limit: Option<usize>,
    ) -> BoxStream<'a, Result<Episode, FetchError>> {
        self.fetch(Some(slug), limit)
    }

    /// Stream records from the catalog root (`scope = None`) or from one show
    ///
    /// At most `limit` records are produced across all pages. Traversal stops
    /// once the server-reported total is reached or a page comes back empty.
    pub fn fetch<T>(
        self,
        scope: Option<&str>,
        limit: Option<usize>,
    ) -> BoxStream<'a, Result<T, FetchError>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        let endpoint = match build_url(self.podcasts_url, &[scope.unwrap_or_default()]) {
            Ok(endpoint) => endpoint,
            Err(e) => return stream::once(async move { Err(FetchError::InvalidUrl(e)) }).boxed(),
        };

        let cursor = Cursor {
            endpoint,
            limit,
            page_size: limit.unwrap_or(PAGE_SIZE),
            next_page: 1,
            emitted: 0,
            buffered: VecDeque::new(),
            more_pages: true,
            token: None,
        };

        let client = self.client;
        let session = self.session;
        stream::try_unfold(cursor, move |cursor| cursor.advance(client, session)).boxed()
    }
}

/// Traversal state carried from one page to the next
struct Cursor<T> {
    endpoint: Url,
    limit: Option<usize>,
    page_size: usize,
    next_page: usize,
    emitted: usize,
    buffered: VecDeque<T>,
    more_pages: bool,
    /// Resolved once per traversal and reused for every page
    token: Option<SecretString>,
}

impl<T: DeserializeOwned> Cursor<T> {
    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.emitted >= limit)
    }

    async fn advance<C: HttpClient>(
        mut self,
        client: &C,
        session: &Session,
    ) -> Result<Option<(T, Self)>, FetchError> {
        loop {
            if self.limit_reached() {
                return Ok(None);
            }

            if let Some(item) = self.buffered.pop_front() {
                self.emitted += 1;
                return Ok(Some((item, self)));
            }

            if !self.more_pages {
                return Ok(None);
            }

            let token = match self.token.take() {
                Some(token) => token,
                None => session.token(client).await?,
            };
            let page = fetch_page::<C, T>(
                client,
                &self.endpoint,
                &token,
                self.page_size,
                self.next_page,
            )
            .await?;
            self.token = Some(token);

            let received = page.data.len();
            debug!(
                url = %self.endpoint,
                page = self.next_page,
                received,
                total = page.head.data.total,
                "Fetched catalog page"
            );

            // An empty page ends the walk even if the total says otherwise
            self.more_pages = received > 0 && self.emitted + received < page.head.data.total;
            self.next_page += 1;

            let room = self
                .limit
                .map_or(received, |limit| limit.saturating_sub(self.emitted));
            self.buffered.extend(page.data.into_iter().take(room));
        }
    }
}

async fn fetch_page<C: HttpClient, T: DeserializeOwned>(
    client: &C,
    endpoint: &Url,
    token: &SecretString,
    hits: usize,
    page: usize,
) -> Result<Envelope<T>, FetchError> {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair("hits", &hits.to_string())
        .append_pair("pg", &page.to_string());

    let response = client
        .get(&url, token.expose_secret())
        .await
        .map_err(|e| FetchError::RequestFailed {
            url: url.to_string(),
            source: e,
        })?;

    if !response.is_success() {
        return Err(FetchError::Upstream {
            url: url.to_string(),
            status: response.status,
            reason: response.reason,
        });
    }

    serde_json::from_slice(&response.body).map_err(|e| FetchError::Parse {
        url: url.to_string(),
        source: e,
    })
}
