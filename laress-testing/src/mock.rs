// Spy providers and call recording

use laress_core::{Container, Error, ProviderEntry, Result, ServiceProvider, Value};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

/// Shared, ordered record of lifecycle calls.
///
/// Clones share the same log, so one `CallLog` can be handed to several
/// spies to check the interleaving of their hooks.
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call
    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    /// Snapshot of every call, oldest first
    pub fn entries(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn was_called(&self, call: &str) -> bool {
        self.count(call) > 0
    }

    /// Index of the first occurrence of `call`
    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls.lock().iter().position(|c| c == call)
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl std::fmt::Debug for CallLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.calls.lock().iter()).finish()
    }
}

/// Provider that records its `register` and `boot` calls as
/// `"<name>:register"` and `"<name>:boot"` in a [`CallLog`].
///
/// It can optionally bind one value during `register` and can be told to
/// fail either hook.
#[derive(Clone)]
pub struct SpyProvider {
    name: String,
    log: CallLog,
    binding: Option<(String, Value)>,
    fail_register: bool,
    fail_boot: bool,
}

impl SpyProvider {
    pub fn new(name: impl Into<String>, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
            binding: None,
            fail_register: false,
            fail_boot: false,
        }
    }

    /// Bind `value` under `binding` as a singleton instance during `register`
    pub fn binds<T: Any + Send + Sync>(mut self, binding: impl Into<String>, value: T) -> Self {
        self.binding = Some((binding.into(), Arc::new(value)));
        self
    }

    pub fn failing_register(mut self) -> Self {
        self.fail_register = true;
        self
    }

    pub fn failing_boot(mut self) -> Self {
        self.fail_boot = true;
        self
    }

    /// Declare this spy as an eager provider under its own name
    pub fn eager(self) -> ProviderEntry {
        let name = self.name.clone();
        ProviderEntry::eager(name, move |_| Box::new(self.clone()))
    }

    /// Declare this spy as a deferred provider answering to `provides`
    pub fn deferred(self, provides: impl Into<String>) -> ProviderEntry {
        let name = self.name.clone();
        ProviderEntry::deferred(name, provides, move |_| Box::new(self.clone()))
    }
}

impl ServiceProvider for SpyProvider {
    fn register(&self, container: &Container) -> Result<()> {
        self.log.record(format!("{}:register", self.name));
        if self.fail_register {
            return Err(Error::provider(&self.name, "register failed"));
        }
        if let Some((binding, value)) = &self.binding {
            container.instance_shared(binding, value.clone(), true);
        }
        Ok(())
    }

    fn boot(&self, _container: &Container) -> Result<()> {
        self.log.record(format!("{}:boot", self.name));
        if self.fail_boot {
            return Err(Error::provider(&self.name, "boot failed"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
