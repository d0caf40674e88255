// Per-request container layered over the application container

use crate::binding::Value;
use crate::http::{HttpRequest, REQUEST_BINDING};
use crate::logging::debug;
use crate::{APP_BINDING, Application, Container, Result};
use std::any::Any;
use std::sync::Arc;

/// The container and request owned by one unit of work.
///
/// Lookups try the request container first, activating request-level
/// deferred providers on the way, then fall back to the application
/// container. A request binding therefore shadows an application binding of
/// the same name, while application singletons are shared by every request.
#[derive(Clone)]
pub struct RequestScope {
    container: Container,
    request: Arc<HttpRequest>,
    app: Application,
}

impl RequestScope {
    pub(crate) fn open(app: &Application, request: HttpRequest) -> Result<Self> {
        let container = app.container().child();
        let request = Arc::new(request);

        container.singleton_instance(APP_BINDING, app.clone());
        container.instance_shared(REQUEST_BINDING, request.clone() as Value, true);

        container
            .services()
            .set_providers(app.request_providers().clone())?;
        container.services().boot()?;

        debug!(
            method = %request.method,
            path = %request.path,
            providers = container.services().provider_count(),
            "Request scope opened"
        );

        Ok(Self {
            container,
            request,
            app: app.clone(),
        })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn app(&self) -> &Application {
        &self.app
    }

    /// Strict lookup: request scope, then application
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        self.container.get(key)
    }

    pub fn get_or<T: Any + Send + Sync>(&self, key: &str, default: T) -> Result<Arc<T>> {
        self.container.get_or(key, default)
    }

    pub fn get_optional<T: Any + Send + Sync>(&self, key: &str) -> Result<Option<Arc<T>>> {
        self.container.get_optional(key)
    }

    pub fn get_value(&self, key: &str) -> Result<Value> {
        self.container.get_value(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.container.has(key)
    }
}

impl std::fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScope")
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("container", &self.container)
            .finish()
    }
}
