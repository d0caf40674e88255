// Test container with overrides and resolution counters

use laress_core::{Binding, Container, ResolutionPolicy, Result};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

/// Container wrapper for tests.
///
/// Overrides replace whatever is bound, including singletons, and are
/// themselves declared as singletons so a provider registering later cannot
/// displace them. Bindings declared through [`TestContainer::counted`] count
/// how many times their resolver actually ran.
#[derive(Clone)]
pub struct TestContainer {
    container: Container,
    resolutions: Arc<Mutex<HashMap<String, usize>>>,
}

impl TestContainer {
    pub fn new() -> Self {
        Self::wrap(Container::new())
    }

    pub fn with_policy(policy: ResolutionPolicy) -> Self {
        Self::wrap(Container::with_policy(policy))
    }

    /// Wrap an existing container, e.g. an application's or a request's
    pub fn wrap(container: Container) -> Self {
        Self {
            container,
            resolutions: Arc::default(),
        }
    }

    /// Force `name` to resolve to `value`
    pub fn override_with<T: Any + Send + Sync>(&self, name: &str, value: T) -> Arc<Binding> {
        self.container.forget(name);
        self.container.singleton_instance(name, value)
    }

    /// Force `name` to resolve through `resolver`
    pub fn override_with_resolver<T, F>(&self, name: &str, resolver: F) -> Arc<Binding>
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.container.forget(name);
        self.container.singleton(name, resolver)
    }

    /// Declare a resolver binding whose invocations are counted
    pub fn counted<T, F>(&self, name: &str, resolver: F, singleton: bool) -> Arc<Binding>
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        let resolutions = self.resolutions.clone();
        let key = name.to_string();
        self.container.bind_with(
            name,
            move |c: &Container| {
                *resolutions.lock().entry(key.clone()).or_insert(0) += 1;
                resolver(c)
            },
            singleton,
        )
    }

    /// How many times the counted resolver for `name` has run
    pub fn resolutions(&self, name: &str) -> usize {
        self.resolutions.lock().get(name).copied().unwrap_or(0)
    }

    pub fn reset_counters(&self) {
        self.resolutions.lock().clear();
    }

    /// Get the underlying container
    pub fn inner(&self) -> &Container {
        &self.container
    }

    pub fn into_inner(self) -> Container {
        self.container
    }
}

impl Default for TestContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestContainer {
    type Target = Container;

    fn deref(&self) -> &Container {
        &self.container
    }
}

impl std::fmt::Debug for TestContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContainer")
            .field("container", &self.container)
            .field("counted", &self.resolutions.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_replaces_singleton() {
        let container = TestContainer::new();
        container.singleton("clock", |_| Ok(1_000u64));
        container.get::<u64>("clock").unwrap();

        container.override_with("clock", 42u64);
        assert_eq!(*container.get::<u64>("clock").unwrap(), 42);

        // Later declarations keep the override
        container.bind("clock", |_| Ok(7u64));
        assert_eq!(*container.get::<u64>("clock").unwrap(), 42);
    }

    #[test]
    fn test_counted_resolver() {
        let container = TestContainer::new();
        container.counted("id", |_| Ok("abc".to_string()), false);

        assert_eq!(container.resolutions("id"), 0);
        container.get::<String>("id").unwrap();
        container.get::<String>("id").unwrap();
        assert_eq!(container.resolutions("id"), 1);

        container.invalidate("id");
        container.get::<String>("id").unwrap();
        assert_eq!(container.resolutions("id"), 2);

        container.reset_counters();
        assert_eq!(container.resolutions("id"), 0);
    }

    #[test]
    fn test_counted_under_transient_policy() {
        let container = TestContainer::with_policy(ResolutionPolicy::Transient);
        container.counted("request_id", |_| Ok(1u32), false);
        container.counted("pool", |_| Ok(2u32), true);

        for _ in 0..3 {
            container.get::<u32>("request_id").unwrap();
            container.get::<u32>("pool").unwrap();
        }

        assert_eq!(container.resolutions("request_id"), 3);
        assert_eq!(container.resolutions("pool"), 1);
    }
}
