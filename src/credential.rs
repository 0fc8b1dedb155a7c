// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

use crate::catalog::timestamp;
use crate::error::CacheError;

/// Paid subscription attached to an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: u64,
    pub billing_period: String,
    pub subscription_status: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub next_payment: DateTime<FixedOffset>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub start_date: DateTime<FixedOffset>,
    #[serde(default, deserialize_with = "timestamp::optional::deserialize")]
    pub end_date: Option<DateTime<FixedOffset>>,
}

impl Subscription {
    /// The instant the subscription stops being valid: the end date when
    /// set, otherwise the next payment date.
    pub fn expires_at(&self) -> DateTime<FixedOffset> {
        self.end_date.unwrap_or(self.next_payment)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() < now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Token and subscription state returned by login
///
/// The token is kept as a [`SecretString`] so it never shows up in `Debug`
/// output; it is only exposed when written to the cache file or attached to
/// a request.
#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(rename = "issubscriber")]
    pub is_subscriber: bool,
    pub paying_customer: bool,
    #[serde(serialize_with = "expose_token", deserialize_with = "secret_token")]
    pub token: SecretString,
    #[serde(default, deserialize_with = "embedded_subscription")]
    pub subscription: Option<Subscription>,
}

impl CredentialRecord {
    /// A record without a subscription counts as expired
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.subscription
            .as_ref()
            .is_none_or(|subscription| subscription.is_expired_at(now))
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

fn expose_token<S: Serializer>(token: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(token.expose_secret())
}

fn secret_token<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

/// The users API embeds the subscription either as an object or as a
/// JSON-encoded string of that object.
fn embedded_subscription<'de, D>(deserializer: D) -> Result<Option<Subscription>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Embedded {
        Object(Subscription),
        Encoded(String),
    }

    match Option::<Embedded>::deserialize(deserializer)? {
        Some(Embedded::Object(subscription)) => Ok(Some(subscription)),
        Some(Embedded::Encoded(text)) if text.trim().is_empty() => Ok(None),
        Some(Embedded::Encoded(text)) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid embedded subscription: {e}"))),
        None => Ok(None),
    }
}

/// Persists a single [`CredentialRecord`] as JSON at a fixed path
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached record
    pub fn load(&self) -> Result<CredentialRecord, CacheError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CacheError::NotFound(self.path.clone())
            } else {
                CacheError::ReadFailed {
                    path: self.path.clone(),
                    source: e,
                }
            }
        })?;

        serde_json::from_str(&content).map_err(|e| CacheError::Invalid {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Write the record, creating parent directories as needed
    pub fn save(&self, record: &CredentialRecord) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::CreateDirectoryFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, json).map_err(|e| CacheError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Delete the cached record; a missing file is not an error
    pub fn remove(&self) -> Result<(), CacheError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::RemoveFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}
