//! Login label from a cached identity.
//!
//! The login page leaves `user_id`, `user_key` and `user_name` in storage.
//! On every page load the pair is checked against the server; only a
//! confirmed identity shows the user's name in the navigation bar.

use std::fmt;

use async_trait::async_trait;
use log::debug;

use crate::error::StoreError;
use crate::error::TransportError;
use crate::store::KeyValueStore;

/// Storage key of the cached user id.
pub const USER_ID_KEY: &str = "user_id";
/// Storage key of the cached user key.
pub const USER_KEY_KEY: &str = "user_key";
/// Storage key of the cached display name.
pub const USER_NAME_KEY: &str = "user_name";

/// Identity cached by a previous login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedIdentity {
    pub user_id: String,
    pub user_key: String,
    pub user_name: String,
}

impl CachedIdentity {
    /// Creates an identity.
    pub fn new(
        user_id: impl Into<String>,
        user_key: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_key: user_key.into(),
            user_name: user_name.into(),
        }
    }

    /// Reads the cached identity. Returns `None` unless all three keys exist.
    pub async fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, StoreError> {
        let user_id = store.get(USER_ID_KEY).await?;
        let user_key = store.get(USER_KEY_KEY).await?;
        let user_name = store.get(USER_NAME_KEY).await?;

        Ok(match (user_id, user_key, user_name) {
            (Some(user_id), Some(user_key), Some(user_name)) => Some(Self {
                user_id,
                user_key,
                user_name,
            }),
            _ => None,
        })
    }

    /// Caches this identity.
    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        store.set(USER_ID_KEY, &self.user_id).await?;
        store.set(USER_KEY_KEY, &self.user_key).await?;
        store.set(USER_NAME_KEY, &self.user_name).await
    }

    /// Removes any cached identity.
    pub async fn clear(store: &dyn KeyValueStore) -> Result<(), StoreError> {
        store.remove(USER_ID_KEY).await?;
        store.remove(USER_KEY_KEY).await?;
        store.remove(USER_NAME_KEY).await
    }
}

/// Server-side identity check, usually `GET /verify/{user_id}/{user_key}`.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Returns `true` if the server confirms the pair.
    async fn verify(&self, user_id: &str, user_key: &str) -> Result<bool, TransportError>;
}

/// Text of the login link in the navigation bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginLabel {
    /// "ログイン"
    LoggedOut,
    /// "{name} さんのユーザページ"
    User(String),
}

impl LoginLabel {
    /// Returns `true` for a confirmed user.
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

impl fmt::Display for LoginLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedOut => f.write_str("ログイン"),
            Self::User(name) => write!(f, "{} さんのユーザページ", name),
        }
    }
}

/// Resolves the login label for this page.
///
/// Missing identity, unreadable storage, a failed request and a negative
/// answer all produce [`LoginLabel::LoggedOut`].
pub async fn resolve_login_label(store: &dyn KeyValueStore, verifier: &dyn IdentityVerifier) -> LoginLabel {
    let identity = match CachedIdentity::load(store).await {
        Ok(Some(identity)) => identity,
        Ok(None) => return LoginLabel::LoggedOut,
        Err(e) => {
            debug!("Could not read cached identity: {}", e);
            return LoginLabel::LoggedOut;
        }
    };

    match verifier.verify(&identity.user_id, &identity.user_key).await {
        Ok(true) => LoginLabel::User(identity.user_name),
        Ok(false) => LoginLabel::LoggedOut,
        Err(e) => {
            debug!("Identity verification failed: {}", e);
            LoginLabel::LoggedOut
        }
    }
}
