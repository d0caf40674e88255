//! Named value slots held by a [`Container`].
//!
//! A binding either wraps a resolver closure or a value supplied up front.
//! The first read computes the value and caches it; later reads return the
//! cached value until [`Binding::invalidate`] clears it.
//!
//! Caching is independent of the `singleton` flag. A transient binding keeps
//! its first value too. The flag only decides two things:
//!
//! - whether re-declaring the same name replaces the binding, and
//! - whether [`Binding::invalidate`] is allowed to clear the cache.
//!
//! Containers built with [`ResolutionPolicy::Transient`] opt out of the
//! first rule for transient resolver bindings, which then run their resolver
//! on every read.

use crate::logging::trace;
use crate::{Container, Result};
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A resolved binding value
pub type Value = Arc<dyn Any + Send + Sync>;

/// Resolver closure stored in a binding; receives the container doing the lookup
pub type ResolverFn = Arc<dyn Fn(&Container) -> Result<Value> + Send + Sync>;

/// How a container treats cached values of transient bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    /// Every binding caches its first value, singleton or not
    #[default]
    CacheAll,
    /// Transient resolver bindings run their resolver on every read
    Transient,
}

impl ResolutionPolicy {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cache_all" | "cache-all" | "cached" => Some(ResolutionPolicy::CacheAll),
            "transient" => Some(ResolutionPolicy::Transient),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionPolicy::CacheAll => "cache_all",
            ResolutionPolicy::Transient => "transient",
        }
    }
}

enum Source {
    Resolver(ResolverFn),
    Instance(Value),
}

/// A single named entry in a container
pub struct Binding {
    name: String,
    singleton: bool,
    source: Source,
    resolved: RwLock<Option<Value>>,
}

impl Binding {
    /// Wrap a resolver without invoking it
    pub fn from_resolver<T, F>(name: impl Into<String>, resolver: F, singleton: bool) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        let resolver: ResolverFn = Arc::new(move |container: &Container| {
            resolver(container).map(|value| Arc::new(value) as Value)
        });
        Self::from_resolver_fn(name, resolver, singleton)
    }

    /// Wrap an already type-erased resolver
    pub fn from_resolver_fn(name: impl Into<String>, resolver: ResolverFn, singleton: bool) -> Self {
        Self {
            name: name.into(),
            singleton,
            source: Source::Resolver(resolver),
            resolved: RwLock::new(None),
        }
    }

    /// Wrap a value that needs no resolver call
    pub fn from_value<T: Any + Send + Sync>(name: impl Into<String>, value: T, singleton: bool) -> Self {
        Self::from_shared(name, Arc::new(value), singleton)
    }

    /// Wrap an already shared value
    pub fn from_shared(name: impl Into<String>, value: Value, singleton: bool) -> Self {
        Self {
            name: name.into(),
            singleton,
            source: Source::Instance(value),
            resolved: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// True when the binding wraps a supplied value rather than a resolver
    pub fn is_instance(&self) -> bool {
        matches!(self.source, Source::Instance(_))
    }

    /// True once a value has been computed and cached
    pub fn is_resolved(&self) -> bool {
        self.resolved.read().is_some()
    }

    /// Return the cached value, computing it on first use.
    ///
    /// Resolver errors propagate and leave the cache empty. No lock is held
    /// while the resolver runs, so it may call back into `container`.
    pub fn resolve(&self, container: &Container) -> Result<Value> {
        let caches = self.caches_under(container.policy());

        if caches {
            if let Some(value) = self.resolved.read().clone() {
                trace!(binding = %self.name, "Binding cache hit");
                return Ok(value);
            }
        }

        let value = match &self.source {
            Source::Instance(value) => value.clone(),
            Source::Resolver(resolver) => {
                trace!(binding = %self.name, "Invoking binding resolver");
                resolver(container)?
            }
        };

        if !caches {
            return Ok(value);
        }

        // First stored value wins if a reentrant call filled the slot meanwhile
        let mut slot = self.resolved.write();
        Ok(slot.get_or_insert(value).clone())
    }

    /// Clear the cached value. Singleton bindings ignore the request.
    ///
    /// Returns true when a cached value was dropped.
    pub fn invalidate(&self) -> bool {
        if self.singleton {
            trace!(binding = %self.name, "Ignoring invalidation of singleton binding");
            return false;
        }
        self.resolved.write().take().is_some()
    }

    fn caches_under(&self, policy: ResolutionPolicy) -> bool {
        match policy {
            ResolutionPolicy::CacheAll => true,
            ResolutionPolicy::Transient => self.singleton || self.is_instance(),
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("singleton", &self.singleton)
            .field("instance", &self.is_instance())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
