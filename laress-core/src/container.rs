// Dependency injection container

use crate::binding::{Binding, ResolutionPolicy, Value};
use crate::logging::{debug, trace};
use crate::{Error, Result, ServiceManager};
use parking_lot::RwLock;
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

pub(crate) struct ContainerInner {
    bindings: RwLock<HashMap<String, Arc<Binding>>>,
    policy: ResolutionPolicy,
    parent: Option<Container>,
    services: ServiceManager,
}

/// The dependency injection container.
///
/// Maps names to [`Binding`]s. Every container owns a [`ServiceManager`]
/// that gets a chance to activate a deferred provider before each lookup.
/// A container created with [`Container::child`] falls back to its parent
/// when a name is not bound locally.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

/// Non-owning handle to a container, held by its service manager
#[derive(Clone)]
pub struct WeakContainer {
    inner: Weak<ContainerInner>,
}

impl WeakContainer {
    pub fn upgrade(&self) -> Option<Container> {
        self.inner.upgrade().map(|inner| Container { inner })
    }
}

impl Container {
    pub fn new() -> Self {
        Self::build(ResolutionPolicy::default(), None)
    }

    /// Create a root container with an explicit resolution policy
    pub fn with_policy(policy: ResolutionPolicy) -> Self {
        Self::build(policy, None)
    }

    /// Create a container that falls back to `self` on a miss
    pub fn child(&self) -> Self {
        Self::build(self.inner.policy, Some(self.clone()))
    }

    /// Create a child container with its own resolution policy
    pub fn child_with_policy(&self, policy: ResolutionPolicy) -> Self {
        Self::build(policy, Some(self.clone()))
    }

    fn build(policy: ResolutionPolicy, parent: Option<Container>) -> Self {
        debug!(
            policy = policy.as_str(),
            scoped = parent.is_some(),
            "Creating new DI container"
        );
        let inner = Arc::new_cyclic(|weak| ContainerInner {
            bindings: RwLock::new(HashMap::new()),
            policy,
            parent,
            services: ServiceManager::new(WeakContainer {
                inner: weak.clone(),
            }),
        });
        Self { inner }
    }

    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.inner.policy
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    /// The service manager seeded into this container
    pub fn services(&self) -> &ServiceManager {
        &self.inner.services
    }

    /// Declare a singleton resolver. Re-declaring a singleton is a no-op.
    pub fn singleton<T, F>(&self, name: &str, resolver: F) -> Arc<Binding>
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.bind_with(name, resolver, true)
    }

    /// Declare a transient resolver, replacing any non-singleton binding
    pub fn bind<T, F>(&self, name: &str, resolver: F) -> Arc<Binding>
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.bind_with(name, resolver, false)
    }

    /// Declare a resolver binding.
    ///
    /// If `name` already holds a singleton binding, that binding is returned
    /// untouched and `resolver` is dropped without being called.
    pub fn bind_with<T, F>(&self, name: &str, resolver: F, singleton: bool) -> Arc<Binding>
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.declare(Binding::from_resolver(name, resolver, singleton))
    }

    /// Bind an already computed value
    pub fn instance<T: Any + Send + Sync>(&self, name: &str, value: T) -> Arc<Binding> {
        self.instance_with(name, value, false)
    }

    /// Bind an already computed value that cannot be re-declared
    pub fn singleton_instance<T: Any + Send + Sync>(&self, name: &str, value: T) -> Arc<Binding> {
        self.instance_with(name, value, true)
    }

    pub fn instance_with<T: Any + Send + Sync>(
        &self,
        name: &str,
        value: T,
        singleton: bool,
    ) -> Arc<Binding> {
        self.declare(Binding::from_value(name, value, singleton))
    }

    /// Bind a value that is already shared behind an `Arc`
    pub fn instance_shared(&self, name: &str, value: Value, singleton: bool) -> Arc<Binding> {
        self.declare(Binding::from_shared(name, value, singleton))
    }

    fn declare(&self, binding: Binding) -> Arc<Binding> {
        let name = binding.name().to_string();

        trace!(binding = %name, "Acquiring write lock for declaration");
        let mut bindings = self.inner.bindings.write();

        if let Some(existing) = bindings.get(&name) {
            if existing.is_singleton() {
                debug!(binding = %name, "Singleton already declared, keeping existing binding");
                return existing.clone();
            }
            debug!(binding = %name, "Replacing transient binding");
        }

        let binding = Arc::new(binding);
        debug!(
            binding = %name,
            singleton = binding.is_singleton(),
            instance = binding.is_instance(),
            "Binding declared"
        );
        bindings.insert(name, binding.clone());
        binding
    }

    /// Resolve `key` and downcast it, failing with `BindingNotFound` on a miss
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        let value = self.get_value(key)?;
        downcast(key, value)
    }

    /// Resolve `key`, falling back to `default` when nothing is bound
    pub fn get_or<T: Any + Send + Sync>(&self, key: &str, default: T) -> Result<Arc<T>> {
        Ok(self
            .get_optional(key)?
            .unwrap_or_else(|| Arc::new(default)))
    }

    /// Resolve `key` if it is bound here or in a parent
    pub fn get_optional<T: Any + Send + Sync>(&self, key: &str) -> Result<Option<Arc<T>>> {
        match self.lookup(key)? {
            Some(value) => downcast(key, value).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve `key` without downcasting
    pub fn get_value(&self, key: &str) -> Result<Value> {
        self.lookup(key)?.ok_or_else(|| {
            debug!(binding = key, "Binding not found in container chain");
            Error::BindingNotFound(key.to_string())
        })
    }

    // Local lookup first, including deferred activation, then the parent.
    fn lookup(&self, key: &str) -> Result<Option<Value>> {
        if let Some(value) = self.resolve_local(key)? {
            return Ok(Some(value));
        }
        match &self.inner.parent {
            Some(parent) => {
                trace!(binding = key, "Delegating lookup to parent container");
                parent.lookup(key)
            }
            None => Ok(None),
        }
    }

    fn resolve_local(&self, key: &str) -> Result<Option<Value>> {
        self.inner.services.register_service_by_name(key)?;

        match self.binding(key) {
            Some(binding) => binding.resolve(self).map(Some),
            None => Ok(None),
        }
    }

    /// The binding declared under `name` in this container, if any
    pub fn binding(&self, name: &str) -> Option<Arc<Binding>> {
        self.inner.bindings.read().get(name).cloned()
    }

    /// True if `name` is bound locally
    pub fn bound(&self, name: &str) -> bool {
        self.inner.bindings.read().contains_key(name)
    }

    /// True if `name` is bound here, provided by a pending deferred provider,
    /// or resolvable through a parent
    pub fn has(&self, name: &str) -> bool {
        let exists = self.bound(name)
            || self.inner.services.provides(name)
            || self.parent().is_some_and(|parent| parent.has(name));

        trace!(binding = name, exists = exists, "Checked binding existence");
        exists
    }

    /// Clear the cached value of a local binding
    pub fn invalidate(&self, name: &str) -> bool {
        self.binding(name)
            .map(|binding| binding.invalidate())
            .unwrap_or(false)
    }

    /// Remove a local binding regardless of its singleton flag
    pub fn forget(&self, name: &str) -> Option<Arc<Binding>> {
        let removed = self.inner.bindings.write().remove(name);
        if removed.is_some() {
            debug!(binding = name, "Binding removed from container");
        }
        removed
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.bindings.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every local binding
    pub fn clear(&self) {
        let mut bindings = self.inner.bindings.write();
        let count = bindings.len();
        bindings.clear();

        debug!(binding_count = count, "Cleared all bindings from container");
    }
}

fn downcast<T: Any + Send + Sync>(key: &str, value: Value) -> Result<Arc<T>> {
    value.downcast::<T>().map_err(|_| Error::TypeMismatch {
        key: key.to_string(),
        expected: type_name::<T>(),
    })
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.len())
            .field("policy", &self.inner.policy)
            .field("scoped", &self.inner.parent.is_some())
            .finish()
    }
}
