// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixtures and an in-memory stand-in for the content API.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};
use url::Url;

use crate::http::{HttpClient, HttpResponse};

pub const BASE_URL: &str = "https://api.test/";
pub const PODCASTS_ROUTE: &str = "podcast/v1/podcast";
pub const USERS_ROUTE: &str = "user/v2";

pub fn show_json(id: u64, slug: &str) -> Value {
    json!({
        "id": id,
        "author": "Il Post",
        "description": format!("All about {slug}"),
        "title": format!("Show {slug}"),
        "image": format!("https://cdn.test/{slug}.jpg"),
        "image_web": format!("https://cdn.test/{slug}-web.jpg"),
        "object": "podcast",
        "count": 120,
        "slug": slug,
        "meta": {
            "gift": true,
            "gift_all": false,
            "pushnotification": true,
            "chronological": 0,
            "order": 3,
            "robot": "",
            "sponsored": false,
            "cyclicality": "daily",
            "evidenza": "",
            "cyclicalitytype": "",
            "background_color": "#ffcc00"
        },
        "access_level": "free"
    })
}

pub fn episode_json(id: u64, slug: &str, date: &str) -> Value {
    json!({
        "id": id,
        "author": "Il Post",
        "title": format!("Episode {id}"),
        "summary": format!("Summary {id}"),
        "content_html": format!("<p>Content {id}</p>"),
        "image": format!("https://cdn.test/ep-{id}.jpg"),
        "image_web": format!("https://cdn.test/ep-{id}-web.jpg"),
        "object": "episode",
        "milliseconds": 1_805_000,
        "minutes": 30,
        "special": false,
        "share_url": format!("https://share.test/{slug}"),
        "slug": slug,
        "full_slug": format!("morning/{slug}"),
        "url": format!("https://www.test/morning/{slug}"),
        "episode_raw_url": format!("https://media.test/{id}.mp3"),
        "date": date,
        "access_level": "free",
        "parent": show_json(1, "morning")
    })
}

pub fn subscription_json(end_date: Value) -> Value {
    json!({
        "id": 99,
        "billing_period": "yearly",
        "subscription_status": "active",
        "next_payment": "2099-06-01T00:00:00+00:00",
        "start_date": "2023-01-01T00:00:00+00:00",
        "end_date": end_date
    })
}

pub fn credential_json(token: &str, subscription: Value) -> Value {
    json!({
        "issubscriber": true,
        "paying_customer": true,
        "token": token,
        "subscription": subscription
    })
}

pub fn login_json(token: &str, end_date: &str) -> Value {
    json!({
        "id": 1,
        "token": "account-token",
        "subscription": true,
        "profile": {
            "meta": credential_json(token, subscription_json(json!(end_date)))
        }
    })
}

/// A catalog page request as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCall {
    /// `None` for the catalog root, the show slug otherwise
    pub scope: Option<String>,
    pub hits: usize,
    pub page: usize,
    pub token: String,
}

/// Serves a paginated catalog and a login endpoint from memory
pub struct MockApi {
    shows: Vec<Value>,
    episodes: HashMap<String, Vec<Value>>,
    reported_total: Option<usize>,
    page_failure: Option<(usize, u16, String)>,
    malformed_pages: bool,
    login_body: Value,
    login_status: (u16, String),
    latency: Option<Duration>,
    login_calls: AtomicUsize,
    last_login_body: Mutex<Value>,
    page_calls: Mutex<Vec<PageCall>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            shows: Vec::new(),
            episodes: HashMap::new(),
            reported_total: None,
            page_failure: None,
            malformed_pages: false,
            login_body: login_json("fresh-token", "2099-01-01T00:00:00+00:00"),
            login_status: (200, "OK".to_string()),
            latency: None,
            login_calls: AtomicUsize::new(0),
            last_login_body: Mutex::new(Value::Null),
            page_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn podcasts_url() -> Url {
        Url::parse(&format!("{BASE_URL}{PODCASTS_ROUTE}")).unwrap()
    }

    pub fn login_url(&self) -> Url {
        Url::parse(&format!("{BASE_URL}{USERS_ROUTE}/auth/login")).unwrap()
    }

    /// Catalog of `count` shows with slugs `show-0`, `show-1`, ...
    pub fn with_shows(mut self, count: usize) -> Self {
        self.shows = (0..count)
            .map(|i| show_json(i as u64, &format!("show-{i}")))
            .collect();
        self
    }

    /// `count` episodes for `slug`, newest first, ids counting up from 1
    pub fn with_episodes(mut self, slug: &str, count: usize) -> Self {
        let episodes = (0..count)
            .map(|i| {
                let day = chrono::DateTime::parse_from_rfc3339("2024-12-31T06:00:00+01:00")
                    .unwrap()
                    - chrono::Duration::days(i as i64);
                episode_json(i as u64 + 1, &format!("ep-{}", count - i), &day.to_rfc3339())
            })
            .collect();
        self.episodes.insert(slug.to_string(), episodes);
        self
    }

    pub fn with_episode_values(mut self, slug: &str, episodes: Vec<Value>) -> Self {
        self.episodes.insert(slug.to_string(), episodes);
        self
    }

    /// Report this total in every page head instead of the real item count
    pub fn with_reported_total(mut self, total: usize) -> Self {
        self.reported_total = Some(total);
        self
    }

    /// Answer requests for `page` with the given status
    pub fn with_page_failure(mut self, page: usize, status: u16, reason: &str) -> Self {
        self.page_failure = Some((page, status, reason.to_string()));
        self
    }

    pub fn with_malformed_pages(mut self) -> Self {
        self.malformed_pages = true;
        self
    }

    pub fn with_login(mut self, body: Value) -> Self {
        self.login_body = body;
        self
    }

    pub fn with_login_status(mut self, status: u16, reason: &str) -> Self {
        self.login_status = (status, reason.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn last_login_body(&self) -> Value {
        self.last_login_body.lock().unwrap().clone()
    }

    pub fn page_calls(&self) -> Vec<PageCall> {
        self.page_calls.lock().unwrap().clone()
    }

    /// Page requests made against the catalog root
    pub fn catalog_calls(&self) -> usize {
        self.page_calls()
            .iter()
            .filter(|call| call.scope.is_none())
            .count()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn respond(status: u16, reason: &str, body: Value) -> HttpResponse {
        HttpResponse {
            status,
            reason: reason.to_string(),
            body: Bytes::from(body.to_string()),
        }
    }
}

#[async_trait]
impl HttpClient for MockApi {
    async fn get(&self, url: &Url, token: &str) -> Result<HttpResponse, reqwest::Error> {
        self.delay().await;

        let route = format!("/{PODCASTS_ROUTE}");
        let scope = url
            .path()
            .strip_prefix(&route)
            .map(|rest| rest.trim_matches('/'))
            .filter(|rest| !rest.is_empty())
            .map(String::from);

        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let hits: usize = query["hits"].parse().unwrap();
        let page: usize = query["pg"].parse().unwrap();

        self.page_calls.lock().unwrap().push(PageCall {
            scope: scope.clone(),
            hits,
            page,
            token: token.to_string(),
        });

        if let Some((failing_page, status, reason)) = &self.page_failure
            && *failing_page == page
        {
            return Ok(Self::respond(*status, reason, json!({ "error": reason })));
        }

        if self.malformed_pages {
            return Ok(Self::respond(200, "OK", json!({ "items": [] })));
        }

        let items = match &scope {
            None => Some(&self.shows),
            Some(slug) => self.episodes.get(slug),
        };
        let Some(items) = items else {
            return Ok(Self::respond(404, "Not Found", json!({ "error": "unknown" })));
        };

        let start = ((page - 1) * hits).min(items.len());
        let end = (start + hits).min(items.len());
        let total = self.reported_total.unwrap_or(items.len());

        Ok(Self::respond(
            200,
            "OK",
            json!({
                "head": { "data": { "total": total } },
                "data": &items[start..end]
            }),
        ))
    }

    async fn post_json(&self, _url: &Url, body: &Value) -> Result<HttpResponse, reqwest::Error> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_login_body.lock().unwrap() = body.clone();
        self.delay().await;

        let (status, reason) = &self.login_status;
        Ok(Self::respond(*status, reason, self.login_body.clone()))
    }
}
