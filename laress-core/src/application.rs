// Application bootstrapper

use crate::logging::{debug, info, warn};
use crate::provider::{ProviderEntry, ProviderTable};
use crate::{
    CONFIG_BINDING, ConfigReader, Container, Error, HttpRequest, HttpResponse, RequestHandler,
    RequestScope, ResolutionPolicy, Result,
};
use std::sync::Arc;

/// Binding name of the application handle inside a request scope
pub const APP_BINDING: &str = "app";

/// Config key selecting the resolution policy of every container
pub const POLICY_CONFIG_KEY: &str = "container.policy";

struct ApplicationInner {
    container: Container,
    request_providers: ProviderTable,
    config: Option<Arc<dyn ConfigReader>>,
}

/// Handle to the application container and its request-level provider table.
///
/// Cheap to clone; pass it to whatever needs the application instead of
/// reaching for a global.
#[derive(Clone)]
pub struct Application {
    inner: Arc<ApplicationInner>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Build the application and run its register and boot passes.
    ///
    /// Any provider failure aborts startup and is returned as-is.
    pub fn init(builder: ApplicationBuilder) -> Result<Self> {
        info!("Bootstrapping Laress application");

        let app = builder.build()?;
        app.boot()?;

        info!(
            bindings = app.container().len(),
            providers = app.container().services().loaded_names().len(),
            "Application bootstrap complete"
        );
        Ok(app)
    }

    /// Get a reference to the application container
    pub fn container(&self) -> &Container {
        &self.inner.container
    }

    /// Config reader supplied at build time, if any
    pub fn config(&self) -> Option<&Arc<dyn ConfigReader>> {
        self.inner.config.as_ref()
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.inner.container.policy()
    }

    pub fn request_providers(&self) -> &ProviderTable {
        &self.inner.request_providers
    }

    /// Run the application register pass
    pub fn register(&self) -> Result<()> {
        self.container().services().register()
    }

    /// Run the application boot pass, registering first if needed
    pub fn boot(&self) -> Result<()> {
        self.container().services().boot()
    }

    pub fn is_booted(&self) -> bool {
        self.container().services().is_booted()
    }

    /// Open a request scope over the application container
    pub fn create_request(&self, request: HttpRequest) -> Result<RequestScope> {
        RequestScope::open(self, request)
    }

    /// Run `handler` inside a fresh request scope.
    ///
    /// Errors from scope creation or the handler become error responses; the
    /// scope is dropped before returning.
    pub async fn handle<H>(&self, request: HttpRequest, handler: &H) -> HttpResponse
    where
        H: RequestHandler + ?Sized,
    {
        let method = request.method.clone();
        let path = request.path.clone();

        let scope = match self.create_request(request) {
            Ok(scope) => scope,
            Err(err) => {
                warn!(method = %method, path = %path, error = %err, "Failed to open request scope");
                return error_response(&err);
            }
        };

        let mut response = match handler.handle(&scope).await {
            Ok(response) => response,
            Err(err) => {
                warn!(method = %method, path = %path, error = %err, "Request failed");
                error_response(&err)
            }
        };
        response.end();

        debug!(method = %method, path = %path, status = response.status, "Request scope closed");
        response
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("container", &self.inner.container)
            .field("request_providers", &self.inner.request_providers.len())
            .field("config", &self.inner.config.is_some())
            .finish()
    }
}

/// Convert an error into a JSON error response
pub fn error_response(err: &Error) -> HttpResponse {
    let status = err.status_code();
    let body = serde_json::json!({
        "error": err.to_string(),
        "status": status,
    });
    HttpResponse::new(status)
        .with_json(&body)
        .unwrap_or_else(|_| HttpResponse::internal_server_error())
}

/// Collects providers, config and policy for an [`Application`]
#[derive(Default)]
pub struct ApplicationBuilder {
    providers: ProviderTable,
    request_providers: ProviderTable,
    config: Option<Arc<dyn ConfigReader>>,
    policy: Option<ResolutionPolicy>,
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Providers loaded into the application container
    pub fn providers(mut self, providers: ProviderTable) -> Self {
        self.providers = providers;
        self
    }

    pub fn provider(mut self, entry: ProviderEntry) -> Self {
        self.providers.push(entry);
        self
    }

    /// Providers seeded into every request container
    pub fn request_providers(mut self, providers: ProviderTable) -> Self {
        self.request_providers = providers;
        self
    }

    pub fn request_provider(mut self, entry: ProviderEntry) -> Self {
        self.request_providers.push(entry);
        self
    }

    pub fn config<C: ConfigReader>(self, config: C) -> Self {
        self.config_shared(Arc::new(config))
    }

    pub fn config_shared(mut self, config: Arc<dyn ConfigReader>) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the policy read from `container.policy`
    pub fn policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Create the application container and declare its providers.
    ///
    /// Nothing is registered or booted yet.
    pub fn build(self) -> Result<Application> {
        if let Some(name) = self.request_providers.first_duplicate() {
            return Err(Error::DuplicateServiceRegistration(name.to_string()));
        }

        let policy = match (self.policy, &self.config) {
            (Some(policy), _) => policy,
            (None, Some(config)) => {
                let configured = config.get_string_or(POLICY_CONFIG_KEY, "");
                ResolutionPolicy::from_str(&configured).unwrap_or_default()
            }
            (None, None) => ResolutionPolicy::default(),
        };

        let container = Container::with_policy(policy);
        if let Some(config) = &self.config {
            container.singleton_instance(CONFIG_BINDING, config.clone());
        }
        container.services().set_providers(self.providers)?;

        debug!(
            policy = policy.as_str(),
            providers = container.services().provider_count(),
            request_providers = self.request_providers.len(),
            "Application container created"
        );

        Ok(Application {
            inner: Arc::new(ApplicationInner {
                container,
                request_providers: self.request_providers,
                config: self.config,
            }),
        })
    }
}
