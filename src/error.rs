// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the on-disk credential cache.
///
/// These never reach the boundary: the session treats any of them as a cache
/// miss and logs in again.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Credential cache {0} does not exist")]
    NotFound(PathBuf),

    #[error("Failed to read credential cache {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential cache {path} is invalid: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write credential cache {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove credential cache {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize credentials: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Login against the users endpoint failed.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication failed: login request to {url} failed: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Authentication failed: login returned {status} {reason}")]
    Rejected { status: u16, reason: String },

    #[error("Authentication failed: malformed login response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Authentication failed: invalid login URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors that abort a paginated traversal of the catalog API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Upstream returned {status} {reason} for {url}")]
    Upstream {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("Failed to parse response from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Errors that can occur while serializing a feed to XML.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to write RSS document: {0}")]
    WriteFailed(#[from] rss::Error),

    #[error("RSS document is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Failure category reported to whatever layer exposes the boundary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AuthenticationFailed,
    Upstream,
    Parse,
    Unavailable,
    Internal,
}

/// Top-level errors for the boundary operations
#[derive(Error, Debug)]
pub enum PostcastError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Fetch(FetchError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<FetchError> for PostcastError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Auth(auth) => Self::Auth(auth),
            other => Self::Fetch(other),
        }
    }
}

impl PostcastError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Auth(_) => ErrorKind::AuthenticationFailed,
            Self::Fetch(FetchError::Upstream { .. }) => ErrorKind::Upstream,
            Self::Fetch(FetchError::Parse { .. }) => ErrorKind::Parse,
            Self::Fetch(FetchError::RequestFailed { .. }) | Self::Timeout(_) => {
                ErrorKind::Unavailable
            }
            Self::Fetch(FetchError::Auth(_)) => ErrorKind::AuthenticationFailed,
            Self::Fetch(FetchError::InvalidUrl(_)) | Self::Feed(_) => ErrorKind::Internal,
        }
    }
}
