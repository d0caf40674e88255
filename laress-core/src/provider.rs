//! Service providers and their declarations.
//!
//! A provider wires bindings into a container in two phases:
//!
//! - `register` may only declare bindings. Other providers may not have
//!   registered yet, so it must not resolve anything it does not own.
//! - `boot` runs after the register pass (or, for a deferred provider,
//!   right after its own on-demand register) and may resolve any name.
//!
//! Whether a provider is eager or deferred is fixed when it is declared in a
//! [`ProviderTable`], via [`ProviderKind`].
//!
//! ```
//! use laress_core::{Container, ProviderTable, Result, ServiceProvider};
//!
//! struct RedirectProvider;
//!
//! impl ServiceProvider for RedirectProvider {
//!     fn register(&self, container: &Container) -> Result<()> {
//!         container.singleton("redirect", |_| Ok("/login".to_string()));
//!         Ok(())
//!     }
//! }
//!
//! let table = ProviderTable::new()
//!     .deferred("redirect", "redirect", |_| Box::new(RedirectProvider));
//! assert_eq!(table.len(), 1);
//! ```

use crate::{Container, Result};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A lifecycle-aware unit that declares bindings
pub trait ServiceProvider: Send + Sync + 'static {
    /// Declare this provider's bindings
    fn register(&self, container: &Container) -> Result<()>;

    /// Finish setup once registration is complete
    fn boot(&self, _container: &Container) -> Result<()> {
        Ok(())
    }

    /// Human-readable name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Constructs a provider for the container that owns its manager
pub type ProviderFactory = Arc<dyn Fn(&Container) -> Box<dyn ServiceProvider> + Send + Sync>;

/// When a provider is loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    /// Loaded during the manager's register pass
    Eager,
    /// Loaded the first time `provides` is looked up
    Deferred { provides: String },
}

impl ProviderKind {
    pub fn is_deferred(&self) -> bool {
        matches!(self, ProviderKind::Deferred { .. })
    }
}

/// A provider declaration: name, kind and factory
#[derive(Clone)]
pub struct ProviderEntry {
    name: String,
    kind: ProviderKind,
    factory: ProviderFactory,
}

impl ProviderEntry {
    pub fn eager<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Container) -> Box<dyn ServiceProvider> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: ProviderKind::Eager,
            factory: Arc::new(factory),
        }
    }

    pub fn deferred<F>(name: impl Into<String>, provides: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Container) -> Box<dyn ServiceProvider> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: ProviderKind::Deferred {
                provides: provides.into(),
            },
            factory: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ProviderKind {
        &self.kind
    }

    /// Name under which the loaded provider is tracked.
    ///
    /// Deferred providers are tracked by the binding that triggers them.
    pub fn key(&self) -> &str {
        match &self.kind {
            ProviderKind::Eager => &self.name,
            ProviderKind::Deferred { provides } => provides,
        }
    }

    /// True if a lookup of `name` should load this provider
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.key() == name
    }

    pub(crate) fn construct(&self, container: &Container) -> Arc<ProviderHandle> {
        let provider = (self.factory)(container);
        Arc::new(ProviderHandle {
            name: self.name.clone(),
            kind: self.kind.clone(),
            provider,
            registered: AtomicBool::new(false),
            booted: AtomicBool::new(false),
        })
    }
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Insertion-ordered set of provider declarations
#[derive(Debug, Clone, Default)]
pub struct ProviderTable {
    entries: Vec<ProviderEntry>,
}

impl ProviderTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eager<F>(self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Container) -> Box<dyn ServiceProvider> + Send + Sync + 'static,
    {
        self.with(ProviderEntry::eager(name, factory))
    }

    pub fn deferred<F>(self, name: impl Into<String>, provides: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Container) -> Box<dyn ServiceProvider> + Send + Sync + 'static,
    {
        self.with(ProviderEntry::deferred(name, provides, factory))
    }

    pub fn with(mut self, entry: ProviderEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn push(&mut self, entry: ProviderEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderEntry> {
        self.entries.iter()
    }

    /// First declared name or key that appears more than once
    pub fn first_duplicate(&self) -> Option<&str> {
        self.entries.iter().enumerate().find_map(|(i, entry)| {
            self.entries[..i]
                .iter()
                .any(|earlier| earlier.answers_to(entry.name()) || earlier.answers_to(entry.key()))
                .then(|| entry.name())
        })
    }
}

impl IntoIterator for ProviderTable {
    type Item = ProviderEntry;
    type IntoIter = std::vec::IntoIter<ProviderEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A constructed provider together with its lifecycle flags.
///
/// Flags only move forward: `Constructed -> Registered -> Booted`.
pub struct ProviderHandle {
    name: String,
    kind: ProviderKind,
    provider: Box<dyn ServiceProvider>,
    registered: AtomicBool,
    booted: AtomicBool,
}

impl ProviderHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ProviderKind {
        &self.kind
    }

    /// Binding name that triggers a deferred provider
    pub fn provides(&self) -> Option<&str> {
        match &self.kind {
            ProviderKind::Eager => None,
            ProviderKind::Deferred { provides } => Some(provides),
        }
    }

    pub fn provider(&self) -> &dyn ServiceProvider {
        self.provider.as_ref()
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    pub fn is_booted(&self) -> bool {
        self.booted.load(Ordering::Acquire)
    }

    pub fn set_registered(&self, registered: bool) {
        self.registered.store(registered, Ordering::Release);
    }

    pub fn set_booted(&self, booted: bool) {
        self.booted.store(booted, Ordering::Release);
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("registered", &self.is_registered())
            .field("booted", &self.is_booted())
            .finish()
    }
}
