//! API key handling.

use secrecy::{ExposeSecret, SecretString};

/// Environment variable read by [`ApiKey::try_from_env`].
pub const API_KEY_ENV: &str = "CRYPTOCOMPARE_API_KEY";

/// An API key for the price API.
#[derive(Clone)]
pub struct ApiKey {
    key: SecretString,
}

impl ApiKey {
    /// Wrap a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: SecretString::from(key.into()),
        }
    }

    /// Read the key from `CRYPTOCOMPARE_API_KEY`.
    ///
    /// Returns `None` if the variable is unset or blank.
    pub fn try_from_env() -> Option<Self> {
        Self::try_from_env_var(API_KEY_ENV)
    }

    /// Read the key from a custom environment variable.
    pub fn try_from_env_var(var: &str) -> Option<Self> {
        std::env::var(var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(Self::new)
    }

    /// Value for the `authorization` header.
    ///
    /// This method exposes the key - use carefully.
    pub fn header_value(&self) -> String {
        format!("Apikey {}", self.key.expose_secret())
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey").field("key", &"[REDACTED]").finish()
    }
}
