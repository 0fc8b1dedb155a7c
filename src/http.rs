// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

/// Header carrying the session token on catalog requests
pub const TOKEN_HEADER: &str = "token";

/// HTTP response with status line and fully buffered body
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Canonical reason phrase for the status, empty if unknown
    pub reason: String,
    /// Response body
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction for testability
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET request carrying the session token header
    async fn get(&self, url: &Url, token: &str) -> Result<HttpResponse, reqwest::Error>;

    /// POST a JSON body
    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, reqwest::Error>;
}

/// Default HTTP client implementation using reqwest
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default settings
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a client whose requests fail once `timeout` elapses
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("postcast/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn buffer(response: reqwest::Response) -> Result<HttpResponse, reqwest::Error> {
        let status = response.status();
        let body = response.bytes().await?;
        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &Url, token: &str) -> Result<HttpResponse, reqwest::Error> {
        let response = self
            .client
            .get(url.clone())
            .header(TOKEN_HEADER, token)
            .send()
            .await?;
        Self::buffer(response).await
    }

    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, reqwest::Error> {
        let response = self.client.post(url.clone()).json(body).send().await?;
        Self::buffer(response).await
    }
}

/// Join path segments onto a base URL
///
/// Leading and trailing slashes are stripped from every part and empty parts
/// are skipped, so `("https://host/", ["/a/", "", "b"])` yields `https://host/a/b`.
pub fn build_url(base: &Url, parts: &[&str]) -> Result<Url, url::ParseError> {
    let mut joined = base.as_str().trim_end_matches('/').to_string();
    for part in parts {
        let part = part.trim_matches('/');
        if part.is_empty() {
            continue;
        }
        joined.push('/');
        joined.push_str(part);
    }
    Url::parse(&joined)
}
