pub mod api;
pub mod catalog;
pub mod config;
pub mod credential;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod http;
pub mod session;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use api::{FEED_EPISODE_LIMIT, PostcastApi};
pub use catalog::{Episode, EpisodeNumber, Show, ShowMetadata};
pub use config::Settings;
pub use credential::{CredentialRecord, CredentialStore, Subscription};
pub use error::{AuthError, CacheError, ErrorKind, FeedError, FetchError, PostcastError};
pub use feed::Feed;
pub use fetch::{Fetcher, PAGE_SIZE};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use session::Session;
