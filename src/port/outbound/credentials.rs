//! Credential lookup port.
//!
//! Account credentials belong to the surrounding application. The core only
//! asks "what credentials do you have for exchange X" and never mutates them.

use std::collections::HashMap;
use std::fmt;

use crate::domain::ExchangeId;

/// API credentials for one exchange account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub secret: String,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Side-effect-free credential lookup.
pub trait CredentialStore: Send + Sync {
    fn credentials_for(&self, exchange: &ExchangeId) -> Option<Credentials>;
}

/// Credential store with no accounts.
pub struct NoCredentials;

impl CredentialStore for NoCredentials {
    fn credentials_for(&self, _exchange: &ExchangeId) -> Option<Credentials> {
        None
    }
}

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    accounts: HashMap<ExchangeId, Credentials>,
}

impl StaticCredentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, exchange: impl Into<ExchangeId>, credentials: Credentials) {
        self.accounts.insert(exchange.into(), credentials);
    }

    /// Read `FEEDHUB_<EXCHANGE>_API_KEY` / `_SECRET` / `_PASSWORD` for each
    /// exchange. Exchanges missing either key or secret are skipped.
    pub fn from_env<'a>(exchanges: impl IntoIterator<Item = &'a ExchangeId>) -> Self {
        let mut store = Self::new();
        for exchange in exchanges {
            let prefix = format!("FEEDHUB_{}", exchange.as_str().to_ascii_uppercase());
            let key = std::env::var(format!("{prefix}_API_KEY")).ok();
            let secret = std::env::var(format!("{prefix}_SECRET")).ok();
            if let (Some(api_key), Some(secret)) = (key, secret) {
                store.insert(
                    exchange.clone(),
                    Credentials {
                        api_key,
                        secret,
                        password: std::env::var(format!("{prefix}_PASSWORD")).ok(),
                    },
                );
            }
        }
        store
    }
}

impl CredentialStore for StaticCredentials {
    fn credentials_for(&self, exchange: &ExchangeId) -> Option<Credentials> {
        self.accounts.get(exchange).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_secrets() {
        let creds = Credentials {
            api_key: "key-123".into(),
            secret: "shh".into(),
            password: None,
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("key-123"));
        assert!(!debug.contains("shh"));
    }

    #[test]
    fn static_store_lookup() {
        let mut store = StaticCredentials::new();
        store.insert(
            "Binance",
            Credentials {
                api_key: "k".into(),
                secret: "s".into(),
                password: None,
            },
        );
        assert!(store.credentials_for(&ExchangeId::new("binance")).is_some());
        assert!(store.credentials_for(&ExchangeId::new("kraken")).is_none());
    }
}
