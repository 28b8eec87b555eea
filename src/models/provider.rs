//! Explicit, caller-owned model provider.

use crate::models::hybrid::{HybridConfig, HybridForecaster};
use std::fmt;

/// Factory plus a lazily created, cached instance.
///
/// The instance is built on first use of [`ModelProvider::get`] and reused
/// afterwards. The provider is an ordinary value owned by the caller.
///
/// # Example
///
/// ```
/// use hybrid_forecast::models::hybrid::HybridConfig;
/// use hybrid_forecast::models::ModelProvider;
///
/// let mut provider = ModelProvider::hybrid(HybridConfig::default().with_horizon(24));
/// assert!(!provider.is_initialized());
///
/// let model = provider.get();
/// assert_eq!(model.config().horizon, 24);
/// assert!(provider.is_initialized());
/// ```
pub struct ModelProvider<M> {
    /// Display name of the model.
    pub name: &'static str,
    factory: Box<dyn Fn() -> M + Send + Sync>,
    instance: Option<M>,
}

impl<M> ModelProvider<M> {
    pub fn new<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn() -> M + Send + Sync + 'static,
    {
        Self {
            name,
            factory: Box::new(factory),
            instance: None,
        }
    }

    /// A fresh instance, independent of the cached one.
    pub fn create(&self) -> M {
        (self.factory)()
    }

    /// The cached instance, created on first call.
    pub fn get(&mut self) -> &mut M {
        self.instance.get_or_insert_with(|| (self.factory)())
    }

    /// The cached instance if it has been created.
    pub fn peek(&self) -> Option<&M> {
        self.instance.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.instance.is_some()
    }

    /// Take the cached instance out, leaving the provider uninitialized.
    pub fn take(&mut self) -> Option<M> {
        self.instance.take()
    }

    /// Drop the cached instance; the next `get` builds a new one.
    pub fn reset(&mut self) {
        self.instance = None;
    }
}

impl ModelProvider<HybridForecaster> {
    /// Provider of hybrid forecasters built from `config`.
    pub fn hybrid(config: HybridConfig) -> Self {
        Self::new("HybridSarimaLstm", move || {
            HybridForecaster::new(config.clone())
        })
    }
}

impl<M> fmt::Debug for ModelProvider<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelProvider")
            .field("name", &self.name)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
