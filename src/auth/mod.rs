//! Credential lifecycle: the token store and the login/register/logout
//! flows around it.
//!
//! Tokens live in the system keyring (service `repolens`), one entry per
//! secret, with the cached user profile stored beside them so everything
//! can be cleared together on logout or refresh failure. Only the fetch
//! layer mutates the pair; everything else reads through it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use keyring::Entry;
use tracing::debug;

use crate::api::UserProfile;
use crate::core::client::{ApiClient, ApiError};

const KEYRING_SERVICE: &str = "repolens";
const ACCESS_TOKEN_KEY: &str = "access-token";
const REFRESH_TOKEN_KEY: &str = "refresh-token";
const USER_PROFILE_KEY: &str = "user-profile";

/// Describes failures when accessing the credential store.
///
/// Recoverable errors indicate the keyring backend was temporarily
/// unavailable (locked or inaccessible); permanent errors surface the
/// underlying cause directly.
#[derive(Debug)]
pub enum CredentialStoreError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
    Encoding(serde_json::Error),
}

impl CredentialStoreError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CredentialStoreError::Recoverable(_))
    }
}

impl From<keyring::Error> for CredentialStoreError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                CredentialStoreError::Recoverable(err)
            }
            other => CredentialStoreError::Permanent(other),
        }
    }
}

impl From<serde_json::Error> for CredentialStoreError {
    fn from(err: serde_json::Error) -> Self {
        CredentialStoreError::Encoding(err)
    }
}

impl fmt::Display for CredentialStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialStoreError::Recoverable(err) | CredentialStoreError::Permanent(err) => {
                write!(f, "{}", err)
            }
            CredentialStoreError::Encoding(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CredentialStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CredentialStoreError::Recoverable(err) | CredentialStoreError::Permanent(err) => {
                Some(err)
            }
            CredentialStoreError::Encoding(err) => Some(err),
        }
    }
}

enum Backend {
    Keyring,
    Memory(Mutex<HashMap<&'static str, String>>),
}

/// Holds the credential pair and the cached profile.
pub struct TokenStore {
    backend: Backend,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore {
    pub fn new() -> Self {
        TokenStore {
            backend: Backend::Keyring,
        }
    }

    /// In-process store for tests and keyring-less environments.
    pub fn in_memory() -> Self {
        TokenStore {
            backend: Backend::Memory(Mutex::new(HashMap::new())),
        }
    }

    fn get(&self, key: &'static str) -> Result<Option<String>, CredentialStoreError> {
        match &self.backend {
            Backend::Keyring => {
                let entry = Entry::new(KEYRING_SERVICE, key)?;
                match entry.get_password() {
                    Ok(value) => Ok(Some(value)),
                    Err(keyring::Error::NoEntry) => Ok(None),
                    Err(err) => Err(err.into()),
                }
            }
            Backend::Memory(map) => Ok(map.lock().unwrap().get(key).cloned()),
        }
    }

    fn set(&self, key: &'static str, value: &str) -> Result<(), CredentialStoreError> {
        match &self.backend {
            Backend::Keyring => {
                let entry = Entry::new(KEYRING_SERVICE, key)?;
                entry.set_password(value).map_err(CredentialStoreError::from)
            }
            Backend::Memory(map) => {
                map.lock().unwrap().insert(key, value.to_string());
                Ok(())
            }
        }
    }

    fn remove(&self, key: &'static str) -> Result<(), CredentialStoreError> {
        match &self.backend {
            Backend::Keyring => {
                let entry = Entry::new(KEYRING_SERVICE, key)?;
                match entry.delete_credential() {
                    Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                    Err(err) => Err(err.into()),
                }
            }
            Backend::Memory(map) => {
                map.lock().unwrap().remove(key);
                Ok(())
            }
        }
    }

    pub fn access_token(&self) -> Result<Option<String>, CredentialStoreError> {
        self.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, CredentialStoreError> {
        self.get(REFRESH_TOKEN_KEY)
    }

    /// Persist a rotated credential pair. Both halves are written, access
    /// token first, so a reader never sees a new refresh token with a
    /// stale access token.
    pub fn set_pair(&self, access: &str, refresh: &str) -> Result<(), CredentialStoreError> {
        self.set(ACCESS_TOKEN_KEY, access)?;
        self.set(REFRESH_TOKEN_KEY, refresh)
    }

    pub fn save_profile(&self, profile: &UserProfile) -> Result<(), CredentialStoreError> {
        let encoded = serde_json::to_string(profile)?;
        self.set(USER_PROFILE_KEY, &encoded)
    }

    pub fn profile(&self) -> Result<Option<UserProfile>, CredentialStoreError> {
        match self.get(USER_PROFILE_KEY)? {
            Some(encoded) => Ok(Some(serde_json::from_str(&encoded)?)),
            None => Ok(None),
        }
    }

    /// Remove tokens and profile together. Every key is attempted even
    /// if an earlier removal fails; the first hard error is reported.
    pub fn clear(&self) -> Result<(), CredentialStoreError> {
        let mut first_err = None;
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_PROFILE_KEY] {
            if let Err(err) = self.remove(key) {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    Api(ApiError),
    /// The backend rejected the attempt; the message is user-facing.
    Rejected(String),
    Store(CredentialStoreError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Api(err) => write!(f, "{}", err),
            AuthError::Rejected(message) => write!(f, "{}", message),
            AuthError::Store(err) => write!(f, "credential store error: {}", err),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::Api(err) => Some(err),
            AuthError::Rejected(_) => None,
            AuthError::Store(err) => Some(err),
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        AuthError::Api(err)
    }
}

impl From<CredentialStoreError> for AuthError {
    fn from(err: CredentialStoreError) -> Self {
        AuthError::Store(err)
    }
}

/// Login, register, and logout flows over the API client.
pub struct AuthService {
    client: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        AuthService { client }
    }

    /// On success the credential pair and the profile are persisted; on
    /// rejection the store is left untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let envelope = self.client.login(email, password).await?;
        if !envelope.success {
            return Err(AuthError::Rejected(or_default(
                envelope.message,
                "Login failed",
            )));
        }
        let Some(data) = envelope.data else {
            return Err(AuthError::Rejected(
                "Login response carried no session data".to_string(),
            ));
        };

        let store = self.client.tokens();
        store.set_pair(&data.access_token, &data.refresh_token)?;
        store.save_profile(&data.user)?;
        Ok(data.user)
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<String, AuthError> {
        let envelope = self.client.register(username, email, password).await?;
        if envelope.success {
            Ok(or_default(envelope.message, "Account created"))
        } else {
            Err(AuthError::Rejected(or_default(
                envelope.message,
                "Registration failed",
            )))
        }
    }

    /// Local credentials are cleared even when the logout request fails;
    /// the server-side session expires on its own.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Err(err) = self.client.logout().await {
            debug!("logout request failed: {err}");
        }
        self.client.tokens().clear()?;
        Ok(())
    }
}

fn or_default(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
