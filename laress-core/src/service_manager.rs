//! Orchestrates service providers against the container that owns them.
//!
//! Eager providers are constructed and registered in one bulk pass; deferred
//! providers stay unconstructed until their binding name is first looked up.
//! The `registered`/`booted` flags on the manager and on each provider only
//! move forward and keep repeated passes from redoing work.
//!
//! A failing `register` or `boot` hook propagates to the caller. Nothing is
//! rolled back: a provider that registered before its boot failed stays
//! flagged as registered, and a later `boot()` call picks up where the
//! failed one stopped. The one exception is on-demand activation: a deferred
//! provider whose `register` fails is forgotten so the next lookup retries it.

use crate::container::WeakContainer;
use crate::logging::{debug, error, info, trace};
use crate::provider::{ProviderEntry, ProviderHandle, ProviderTable};
use crate::{Container, Error, Result};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

#[derive(Default)]
struct ManagerState {
    providers: ProviderTable,
    loaded: IndexMap<String, Arc<ProviderHandle>>,
    registered: bool,
    booted: bool,
}

impl ManagerState {
    fn find_loaded(&self, name: &str) -> Option<&Arc<ProviderHandle>> {
        self.loaded
            .get(name)
            .or_else(|| self.loaded.values().find(|handle| handle.name() == name))
    }
}

/// Lifecycle orchestrator seeded into every [`Container`]
pub struct ServiceManager {
    container: WeakContainer,
    state: Mutex<ManagerState>,
}

impl ServiceManager {
    pub(crate) fn new(container: WeakContainer) -> Self {
        Self {
            container,
            state: Mutex::new(ManagerState::default()),
        }
    }

    fn container(&self) -> Result<Container> {
        self.container.upgrade().ok_or(Error::ContainerDropped)
    }

    /// Replace the provider table.
    ///
    /// Returns `Ok(false)` without touching anything once a register pass has
    /// completed.
    pub fn set_providers(&self, providers: ProviderTable) -> Result<bool> {
        if let Some(name) = providers.first_duplicate() {
            return Err(Error::DuplicateServiceRegistration(name.to_string()));
        }

        let mut state = self.state.lock();
        if state.registered {
            debug!("Service manager already registered, ignoring new provider table");
            return Ok(false);
        }

        debug!(provider_count = providers.len(), "Provider table set");
        state.providers = providers;
        Ok(true)
    }

    /// Declare one more provider.
    ///
    /// Fails with `DuplicateServiceRegistration` if its name or provided key
    /// is already declared. After the register pass, an eager provider is
    /// loaded on the spot.
    pub fn add_provider(&self, entry: ProviderEntry) -> Result<()> {
        let load_now = {
            let mut state = self.state.lock();
            let duplicate = state
                .providers
                .iter()
                .any(|existing| existing.answers_to(entry.name()) || existing.answers_to(entry.key()));
            if duplicate {
                error!(provider = entry.name(), "Service declared twice");
                return Err(Error::DuplicateServiceRegistration(entry.name().to_string()));
            }

            state.providers.push(entry.clone());
            debug!(provider = entry.name(), deferred = entry.kind().is_deferred(), "Provider declared");
            state.registered && !entry.kind().is_deferred()
        };

        if load_now {
            let container = self.container()?;
            self.load(&container, &entry)?;
        }
        Ok(())
    }

    /// Register every eager provider once
    pub fn register(&self) -> Result<()> {
        if self.is_registered() {
            trace!("Service manager already registered");
            return Ok(());
        }

        let container = self.container()?;
        let mut count = 0;

        // Re-scan each step: a provider may declare further providers while
        // it registers.
        loop {
            let next = {
                let state = self.state.lock();
                state
                    .providers
                    .iter()
                    .find(|entry| {
                        !entry.kind().is_deferred() && state.find_loaded(entry.key()).is_none()
                    })
                    .cloned()
            };
            let Some(entry) = next else { break };
            if self.load(&container, &entry)? {
                count += 1;
            }
        }

        self.state.lock().registered = true;
        info!(provider_count = count, "Registered eager service providers");
        Ok(())
    }

    /// Load the provider answering to `name` if it is declared and not yet
    /// loaded. Returns true when a provider was loaded by this call.
    ///
    /// If the provider's `register` fails it is dropped again, so the next
    /// lookup of `name` retries it and reports the same failure.
    pub fn register_service_by_name(&self, name: &str) -> Result<bool> {
        let entry = {
            let state = self.state.lock();
            if state.find_loaded(name).is_some() {
                return Ok(false);
            }
            state
                .providers
                .iter()
                .find(|entry| entry.answers_to(name))
                .cloned()
        };

        let Some(entry) = entry else {
            return Ok(false);
        };

        debug!(binding = name, provider = entry.name(), "Activating service on demand");
        let container = self.container()?;
        self.load(&container, &entry).inspect_err(|_| {
            let mut state = self.state.lock();
            if state
                .loaded
                .get(entry.key())
                .is_some_and(|handle| !handle.is_registered())
            {
                state.loaded.shift_remove(entry.key());
            }
        })
    }

    /// Boot every loaded provider, registering first if needed
    pub fn boot(&self) -> Result<()> {
        if self.is_booted() {
            trace!("Service manager already booted");
            return Ok(());
        }

        self.register()?;

        // Providers loaded while booting are appended to `loaded` and picked up
        // by the same loop.
        let mut index = 0;
        loop {
            let next = self
                .state
                .lock()
                .loaded
                .get_index(index)
                .map(|(_, handle)| handle.clone());
            let Some(handle) = next else { break };
            self.boot_service(&handle)?;
            index += 1;
        }

        self.state.lock().booted = true;
        info!(provider_count = index, "Booted service providers");
        Ok(())
    }

    /// Boot a single provider, registering it first if needed
    pub fn boot_service(&self, handle: &ProviderHandle) -> Result<()> {
        if handle.is_booted() {
            return Ok(());
        }

        let container = self.container()?;
        self.register_provider(&container, handle)?;

        if let Err(e) = handle.provider().boot(&container) {
            error!(provider = handle.name(), error = %e, "Service provider failed to boot");
            return Err(e);
        }
        handle.set_booted(true);

        debug!(provider = handle.name(), "Service provider booted");
        Ok(())
    }

    fn load(&self, container: &Container, entry: &ProviderEntry) -> Result<bool> {
        if self.is_service_loaded(entry.key()) {
            return Ok(false);
        }

        let handle = entry.construct(container);
        let booted = {
            let mut state = self.state.lock();
            if state.find_loaded(entry.key()).is_some() {
                return Ok(false);
            }
            // Tracked before `register` runs so a reentrant lookup of the same
            // name does not load it twice.
            state.loaded.insert(entry.key().to_string(), handle.clone());
            state.booted
        };

        self.register_provider(container, &handle)?;
        if booted {
            self.boot_service(&handle)?;
        }
        Ok(true)
    }

    fn register_provider(&self, container: &Container, handle: &ProviderHandle) -> Result<()> {
        if handle.is_registered() {
            return Ok(());
        }

        if let Err(e) = handle.provider().register(container) {
            error!(provider = handle.name(), error = %e, "Service provider failed to register");
            return Err(e);
        }
        handle.set_registered(true);

        debug!(
            provider = handle.name(),
            deferred = handle.kind().is_deferred(),
            "Service provider registered"
        );
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        self.state.lock().registered
    }

    pub fn is_booted(&self) -> bool {
        self.state.lock().booted
    }

    /// True once the provider tracked under `name` has been constructed
    pub fn is_service_loaded(&self, name: &str) -> bool {
        self.state.lock().find_loaded(name).is_some()
    }

    /// The loaded provider tracked under `name` (its key or its declared name)
    pub fn provider(&self, name: &str) -> Option<Arc<ProviderHandle>> {
        self.state.lock().find_loaded(name).cloned()
    }

    /// Keys of loaded providers in load order
    pub fn loaded_names(&self) -> Vec<String> {
        self.state.lock().loaded.keys().cloned().collect()
    }

    /// True if a declared, not yet loaded deferred provider supplies `name`
    pub fn provides(&self, name: &str) -> bool {
        let state = self.state.lock();
        state.find_loaded(name).is_none()
            && state
                .providers
                .iter()
                .any(|entry| entry.kind().is_deferred() && entry.key() == name)
    }

    pub fn provider_count(&self) -> usize {
        self.state.lock().providers.len()
    }
}

impl fmt::Debug for ServiceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ServiceManager")
            .field("providers", &state.providers.len())
            .field("loaded", &state.loaded.len())
            .field("registered", &state.registered)
            .field("booted", &state.booted)
            .finish()
    }
}
