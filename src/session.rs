// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::credential::{CredentialRecord, CredentialStore, Subscription};
use crate::error::AuthError;
use crate::http::HttpClient;

#[derive(Deserialize)]
struct LoginResponse {
    profile: LoginProfile,
}

#[derive(Deserialize)]
struct LoginProfile {
    meta: CredentialRecord,
}

struct ActiveCredential {
    record: CredentialRecord,
    /// Login succeeded but the account has no live subscription. The token
    /// still unlocks free content, so it is kept instead of logging in again
    /// on every request.
    free_tier: bool,
}

impl ActiveCredential {
    fn is_usable(&self) -> bool {
        self.free_tier || !self.record.is_expired()
    }
}

/// Resolves the token attached to catalog requests.
///
/// The credential lives in memory behind an async mutex that is held for the
/// whole resolution, so concurrent callers on a cold session wait for a
/// single cache read or login instead of racing their own.
pub struct Session {
    store: CredentialStore,
    login_url: Url,
    username: SecretString,
    password: SecretString,
    active: Mutex<Option<ActiveCredential>>,
}

impl Session {
    pub fn new(
        store: CredentialStore,
        login_url: Url,
        username: SecretString,
        password: SecretString,
    ) -> Self {
        Self {
            store,
            login_url,
            username,
            password,
            active: Mutex::new(None),
        }
    }

    /// Current token, reading the cache file or logging in when needed
    ///
    /// A credential already in memory is reused without touching the disk or
    /// the network until its subscription runs out, at which point the cache
    /// file is deleted and a fresh login happens.
    pub async fn token<C: HttpClient>(&self, client: &C) -> Result<SecretString, AuthError> {
        let mut active = self.active.lock().await;

        if let Some(current) = active.as_ref()
            && current.is_usable()
        {
            return Ok(current.record.token.expose_secret().to_owned().into());
        }

        if active.take().is_some() {
            warn!("Subscription expired during this session, logging in again");
            self.discard_cache();
        }

        let resolved = self.resolve(client).await?;
        let token = resolved.record.token.expose_secret().to_owned().into();
        *active = Some(resolved);
        Ok(token)
    }

    /// Subscription of the credential currently in use, if any
    pub async fn subscription(&self) -> Option<Subscription> {
        self.active
            .lock()
            .await
            .as_ref()
            .and_then(|current| current.record.subscription.clone())
    }

    /// True when no credential has been resolved yet or the subscription lapsed
    pub async fn is_expired(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .is_none_or(|current| current.record.is_expired())
    }

    async fn resolve<C: HttpClient>(&self, client: &C) -> Result<ActiveCredential, AuthError> {
        match self.store.load() {
            Ok(record) if !record.is_expired() => {
                info!("Found valid subscription cache, using it");
                log_subscription_status(&record);
                return Ok(ActiveCredential {
                    record,
                    free_tier: false,
                });
            }
            Ok(_) => {
                info!("Cached subscription expired, discarding it");
                self.discard_cache();
            }
            Err(e) => debug!(error = %e, "No usable subscription cache"),
        }

        info!("Logging in");
        let record = self.login(client).await?;
        info!("Logged in successfully");

        if let Err(e) = self.store.save(&record) {
            warn!(error = %e, "Failed to persist credentials, next start will log in again");
        }

        log_subscription_status(&record);
        let free_tier = record.is_expired();
        Ok(ActiveCredential { record, free_tier })
    }

    async fn login<C: HttpClient>(&self, client: &C) -> Result<CredentialRecord, AuthError> {
        let body = serde_json::json!({
            "username": self.username.expose_secret(),
            "password": self.password.expose_secret(),
        });

        let response = client
            .post_json(&self.login_url, &body)
            .await
            .map_err(|e| AuthError::RequestFailed {
                url: self.login_url.to_string(),
                source: e,
            })?;

        if !response.is_success() {
            return Err(AuthError::Rejected {
                status: response.status,
                reason: response.reason,
            });
        }

        let user: LoginResponse = serde_json::from_slice(&response.body)?;
        Ok(user.profile.meta)
    }

    fn discard_cache(&self) {
        if let Err(e) = self.store.remove() {
            warn!(error = %e, "Failed to remove stale subscription cache");
        }
    }
}

fn log_subscription_status(record: &CredentialRecord) {
    match &record.subscription {
        Some(subscription) if !subscription.is_expired() => info!(
            until = %subscription.expires_at().format("%Y-%m-%d %H:%M:%S"),
            "Subscription is active"
        ),
        _ => warn!("Subscription expired, only free content will be available"),
    }
}
