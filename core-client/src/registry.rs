//! Adapter registry.
//!
//! An explicit map from provider tag to factory function replaces any
//! dynamic discovery: a host registers the providers it links, then builds
//! adapters from immutable [`AdapterParts`]. Configuration is a value passed
//! in at construction, never a mutable global.

use bridge_traits::http::HttpTransport;
use bridge_traits::storage::{LocalStore, SecureStore};
use core_runtime::events::EventBus;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::adapter::CloudAdapter;
use crate::config::ProviderConfig;
use crate::model::ProviderKind;

/// Everything a factory needs to assemble an adapter.
pub struct AdapterParts {
    pub config: ProviderConfig,
    pub http: Arc<dyn HttpTransport>,
    pub secure: Arc<dyn SecureStore>,
    pub local: Arc<dyn LocalStore>,
    pub events: EventBus,
}

impl AdapterParts {
    pub fn new(
        config: ProviderConfig,
        http: Arc<dyn HttpTransport>,
        secure: Arc<dyn SecureStore>,
        local: Arc<dyn LocalStore>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            http,
            secure,
            local,
            events,
        }
    }
}

/// Factory producing a constructed adapter from its parts.
pub type AdapterFactory = Box<dyn Fn(AdapterParts) -> Arc<dyn CloudAdapter> + Send + Sync>;

/// Registry mapping provider tags to adapter factories.
///
/// # Example
///
/// ```ignore
/// use core_client::{AdapterRegistry, ProviderKind};
///
/// let mut registry = AdapterRegistry::new();
/// provider_box::register(&mut registry);
/// provider_dropbox::register(&mut registry);
///
/// let adapter = registry.build(ProviderKind::Dropbox, parts).unwrap();
/// ```
#[derive(Default)]
pub struct AdapterRegistry {
    factories: HashMap<ProviderKind, AdapterFactory>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register(&mut self, kind: ProviderKind, factory: AdapterFactory) {
        debug!(provider = kind.as_str(), "Registering adapter factory");
        self.factories.insert(kind, factory);
    }

    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Registered provider tags, in registration-independent order.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    /// Build an adapter for `kind`, or `None` when no factory is registered.
    pub fn build(&self, kind: ProviderKind, parts: AdapterParts) -> Option<Arc<dyn CloudAdapter>> {
        self.factories.get(&kind).map(|factory| factory(parts))
    }
}
