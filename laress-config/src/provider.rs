// Publishes a ConfigService into the application container

use crate::ConfigService;
use laress_core::{CONFIG_BINDING, ConfigReader, Container, ProviderEntry, Result, ServiceProvider};
use std::sync::Arc;
use tracing::debug;

/// Binding name of the concrete [`ConfigService`]
pub const CONFIG_SERVICE_BINDING: &str = "config.service";

/// Eager provider binding `"config"` (as `Arc<dyn ConfigReader>`) and
/// `"config.service"` (as [`ConfigService`]).
///
/// Both are singleton instances, so a config reader handed to the
/// application builder keeps precedence over this provider.
pub struct ConfigServiceProvider {
    service: ConfigService,
}

impl ConfigServiceProvider {
    pub fn new(service: ConfigService) -> Self {
        Self { service }
    }

    /// Provider table entry named `"config"`
    pub fn entry(service: ConfigService) -> ProviderEntry {
        ProviderEntry::eager("config", move |_| Box::new(Self::new(service.clone())))
    }
}

impl ServiceProvider for ConfigServiceProvider {
    fn register(&self, container: &Container) -> Result<()> {
        let reader: Arc<dyn ConfigReader> = Arc::new(self.service.clone());
        container.singleton_instance(CONFIG_BINDING, reader);
        container.singleton_instance(CONFIG_SERVICE_BINDING, self.service.clone());

        debug!(keys = self.service.manager().keys().len(), "Configuration bound");
        Ok(())
    }

    fn name(&self) -> &str {
        "config"
    }
}
