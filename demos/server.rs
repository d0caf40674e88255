//! Minimal HTTP server wired from service providers.
//!
//! Run with `cargo run --example server`, then:
//!
//! ```text
//! curl http://127.0.0.1:3000/hello
//! ```
//!
//! Set `APP_LOG__LEVEL=debug` to watch providers register and boot.

use laress::logging::{LogConfig, info};
use laress::prelude::*;
use laress_config::ConfigService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Application-wide hit counter
struct Counter(AtomicU64);

struct CounterProvider;

impl ServiceProvider for CounterProvider {
    fn register(&self, container: &Container) -> Result<()> {
        container.singleton("counter", |_| Ok(Counter(AtomicU64::new(0))));
        Ok(())
    }

    fn boot(&self, container: &Container) -> Result<()> {
        let config = container.get::<Arc<dyn ConfigReader>>("config")?;
        info!(name = %config.get_string_or("app.name", "laress"), "Counter ready");
        Ok(())
    }
}

/// Per-request greeting built from the request path
struct GreetingProvider;

impl ServiceProvider for GreetingProvider {
    fn register(&self, container: &Container) -> Result<()> {
        container.singleton("greeting", |c: &Container| {
            let request = c.get::<HttpRequest>("request")?;
            let name = request.path.trim_start_matches('/');
            Ok(format!("Hello, {}!", if name.is_empty() { "world" } else { name }))
        });
        Ok(())
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = ConfigService::builder()
        .with_prefix("APP_")
        .load_env()
        .default_value("app.name", "demo")
        .default_value("server.port", 3000)
        .build()?;

    let _guard = LogConfig::from_reader(&config).init()?;

    let port = config.get_i64_or("server.port", 3000) as u16;
    let app = Application::init(
        Application::builder()
            .config(config)
            .provider(ProviderEntry::eager("counter", |_| Box::new(CounterProvider)))
            .request_provider(ProviderEntry::deferred("greeting", "greeting", |_| {
                Box::new(GreetingProvider)
            })),
    )?;

    let handler = handler_fn(|scope: RequestScope| async move {
        let counter = scope.get::<Counter>("counter")?;
        let hits = counter.0.fetch_add(1, Ordering::Relaxed) + 1;
        let greeting = scope.get::<String>("greeting")?;

        HttpResponse::ok().with_json(&serde_json::json!({
            "message": greeting.as_str(),
            "hits": hits,
        }))
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    app.listen(addr, Arc::new(handler)).await?;
    Ok(())
}
