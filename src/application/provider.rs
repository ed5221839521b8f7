//! Provider registry: which configured endpoint serves which exchange.
//!
//! # Resolution rule
//!
//! Among enabled providers covering the exchange:
//!
//! 1. a provider that lists the exchange explicitly beats a wildcard one,
//!    regardless of priority;
//! 2. then lower priority number wins;
//! 3. then a `connected` provider beats any other status.
//!
//! Remaining ties keep registration order.

use std::cmp::Ordering;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::{ExchangeId, Provider, ProviderId, ProviderKind, ProviderStatus};
use crate::error::{ConfigError, Result};
use crate::port::{CredentialStore, Credentials};

/// Resolved provider for one exchange, with account credentials if any.
#[derive(Debug, Clone)]
pub struct ExchangeMapping {
    pub exchange: ExchangeId,
    pub provider: Provider,
    pub credentials: Option<Credentials>,
}

/// Table of configured providers.
///
/// The application mutates it through the methods below; everything else
/// only reads snapshots.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: RwLock<Vec<Provider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a seed list, validating each provider.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid or duplicate provider.
    pub fn with_providers(providers: impl IntoIterator<Item = Provider>) -> Result<Self> {
        let registry = Self::new();
        for provider in providers {
            registry.add(provider)?;
        }
        Ok(registry)
    }

    /// Pick the provider serving `exchange`, if any.
    #[must_use]
    pub fn resolve(&self, exchange: &ExchangeId) -> Option<Provider> {
        let providers = self.providers.read();
        let chosen = providers
            .iter()
            .filter(|p| p.serves(exchange))
            .min_by(|a, b| rank(a, b, exchange))
            .cloned();

        match &chosen {
            Some(p) => debug!(exchange = %exchange, provider = %p.id, "Resolved provider"),
            None => debug!(exchange = %exchange, "No provider for exchange"),
        }
        chosen
    }

    /// Resolve every exchange and attach credentials where the account has them.
    ///
    /// Exchanges without a provider are omitted.
    pub fn create_mapping(
        &self,
        exchanges: &[ExchangeId],
        credentials: &dyn CredentialStore,
    ) -> Vec<ExchangeMapping> {
        exchanges
            .iter()
            .filter_map(|exchange| {
                let provider = self.resolve(exchange)?;
                Some(ExchangeMapping {
                    exchange: exchange.clone(),
                    provider,
                    credentials: credentials.credentials_for(exchange),
                })
            })
            .collect()
    }

    /// Register a new provider.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateProvider`] if the id is taken, or a
    /// validation error for malformed configuration.
    pub fn add(&self, provider: Provider) -> Result<()> {
        validate(&provider)?;
        let mut providers = self.providers.write();
        if providers.iter().any(|p| p.id == provider.id) {
            return Err(ConfigError::DuplicateProvider {
                id: provider.id.to_string(),
            }
            .into());
        }
        info!(provider = %provider.id, priority = provider.priority, "Provider added");
        providers.push(provider);
        Ok(())
    }

    /// Replace an existing provider, returning the previous version.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProvider`] if the id is not registered,
    /// or a validation error for malformed configuration.
    pub fn update(&self, provider: Provider) -> Result<Provider> {
        validate(&provider)?;
        let mut providers = self.providers.write();
        let slot = providers
            .iter_mut()
            .find(|p| p.id == provider.id)
            .ok_or_else(|| unknown(&provider.id))?;
        info!(provider = %provider.id, "Provider updated");
        Ok(std::mem::replace(slot, provider))
    }

    /// Remove a provider, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProvider`] if no provider has this id.
    pub fn remove(&self, id: &ProviderId) -> Result<Provider> {
        let mut providers = self.providers.write();
        let index = providers
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| unknown(id))?;
        info!(provider = %id, "Provider removed");
        Ok(providers.remove(index))
    }

    /// Enable or disable a provider, returning the updated snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProvider`] if no provider has this id.
    pub fn set_enabled(&self, id: &ProviderId, enabled: bool) -> Result<Provider> {
        self.modify(id, |p| p.enabled = enabled)
    }

    /// Record a provider's connection status.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProvider`] if no provider has this id.
    pub fn set_status(&self, id: &ProviderId, status: ProviderStatus) -> Result<Provider> {
        self.modify(id, |p| p.status = status)
    }

    #[must_use]
    pub fn get(&self, id: &ProviderId) -> Option<Provider> {
        self.providers.read().iter().find(|p| &p.id == id).cloned()
    }

    /// Snapshot of all providers in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<Provider> {
        self.providers.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn modify(&self, id: &ProviderId, f: impl FnOnce(&mut Provider)) -> Result<Provider> {
        let mut providers = self.providers.write();
        let provider = providers
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| unknown(id))?;
        f(provider);
        Ok(provider.clone())
    }
}

/// Ordering used by [`ProviderRegistry::resolve`]; `Less` is preferred.
fn rank(a: &Provider, b: &Provider, exchange: &ExchangeId) -> Ordering {
    let wildcard_only = |p: &Provider| !p.exchanges.lists(exchange);
    let disconnected = |p: &Provider| p.status != ProviderStatus::Connected;

    wildcard_only(a)
        .cmp(&wildcard_only(b))
        .then(a.priority.cmp(&b.priority))
        .then(disconnected(a).cmp(&disconnected(b)))
}

fn unknown(id: &ProviderId) -> crate::error::Error {
    ConfigError::UnknownProvider { id: id.to_string() }.into()
}

fn validate(provider: &Provider) -> Result<()> {
    if provider.id.as_str().trim().is_empty() {
        return Err(ConfigError::MissingField { field: "id" }.into());
    }
    if provider.exchanges.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "exchanges",
            reason: format!("provider '{}' serves no exchanges", provider.id),
        }
        .into());
    }
    if provider.kind == ProviderKind::Server && provider.connection.server_url.is_none() {
        return Err(ConfigError::MissingField { field: "server_url" }.into());
    }
    Ok(())
}
