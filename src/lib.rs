// Laress - a service container with eager and deferred providers
//
// This library wires an application container from a table of service
// providers and gives every request its own child container.

// Re-export core functionality
pub use laress_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use laress_config;

#[cfg(feature = "testing")]
pub use laress_testing;

pub mod prelude {
    pub use crate::{
        Application,
        ApplicationBuilder,
        Container,
        ConfigReader,
        Error,
        HttpRequest,
        HttpResponse,
        ProviderEntry,
        ProviderTable,
        RequestHandler,
        RequestScope,
        ResolutionPolicy,
        Result,
        ServiceProvider,
        handler_fn,
    };

    #[cfg(feature = "config")]
    pub use laress_config::{ConfigService, ConfigServiceProvider};
}
