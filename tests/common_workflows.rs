//! Integration tests for common Laress workflows.
//!
//! These tests go through the facade crate the way an application would.

use laress::prelude::*;
use laress::{APP_BINDING, CONFIG_BINDING, REQUEST_BINDING};
use std::sync::Arc;

// =============================================================================
// Fixtures
// =============================================================================

struct Mailer {
    transport: String,
}

struct MailProvider;

impl ServiceProvider for MailProvider {
    fn register(&self, container: &Container) -> Result<()> {
        container.singleton("mailer", |c: &Container| {
            let config = c.get::<Arc<dyn ConfigReader>>(CONFIG_BINDING)?;
            Ok(Mailer {
                transport: config.get_string_or("mail.transport", "log"),
            })
        });
        Ok(())
    }
}

struct AuthProvider;

impl ServiceProvider for AuthProvider {
    fn register(&self, container: &Container) -> Result<()> {
        container.singleton("auth.user", |c: &Container| {
            let request = c.get::<HttpRequest>(REQUEST_BINDING)?;
            Ok(request.header("authorization").map(|token| token.to_string()))
        });
        Ok(())
    }
}

fn app(config: serde_json::Value) -> Application {
    Application::init(
        Application::builder()
            .config(config)
            .providers(ProviderTable::new().deferred("mail", "mailer", |_| Box::new(MailProvider)))
            .request_providers(
                ProviderTable::new().deferred("auth", "auth.user", |_| Box::new(AuthProvider)),
            ),
    )
    .unwrap()
}

// =============================================================================
// Application Tests
// =============================================================================

#[test]
fn test_deferred_application_service_reads_config() {
    let app = app(serde_json::json!({ "mail": { "transport": "smtp" } }));

    assert!(!app.container().services().is_service_loaded("mailer"));
    let mailer = app.container().get::<Mailer>("mailer").unwrap();
    assert_eq!(mailer.transport, "smtp");
    assert!(app.container().services().is_service_loaded("mailer"));
}

#[test]
fn test_request_resolves_application_and_request_services() {
    let app = app(serde_json::json!({}));
    let scope = app
        .create_request(HttpRequest::new("GET", "/me").with_header("Authorization", "Bearer t"))
        .unwrap();

    let user = scope.get::<Option<String>>("auth.user").unwrap();
    assert_eq!(user.as_deref(), Some("Bearer t"));

    let mailer = scope.get::<Mailer>("mailer").unwrap();
    assert_eq!(mailer.transport, "log");
    assert!(app.container().bound("mailer"));
    assert!(!app.container().bound("auth.user"));

    assert!(scope.container().bound(APP_BINDING));
}

#[tokio::test]
async fn test_handler_round_trip() {
    let app = app(serde_json::json!({}));
    let handler = handler_fn(|scope: RequestScope| async move {
        let user = scope.get::<Option<String>>("auth.user")?;
        if user.is_none() {
            return Ok(HttpResponse::new(401));
        }
        HttpResponse::ok().with_json(&serde_json::json!({ "path": scope.request().path }))
    });

    let anonymous = app.handle(HttpRequest::new("GET", "/account"), &handler).await;
    assert_eq!(anonymous.status, 401);

    let signed_in = app
        .handle(
            HttpRequest::new("GET", "/account").with_header("authorization", "Bearer t"),
            &handler,
        )
        .await;
    assert_eq!(signed_in.status, 200);
    let body: serde_json::Value = serde_json::from_slice(&signed_in.body).unwrap();
    assert_eq!(body["path"], "/account");
}

// =============================================================================
// Config Tests
// =============================================================================

#[cfg(feature = "config")]
#[test]
fn test_config_service_provider_from_file() {
    use laress::laress_config::ConfigServiceProvider;
    use std::io::Write;

    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[container]\npolicy = \"transient\"\n\n[mail]\ntransport = \"ses\"").unwrap();

    let service = ConfigService::builder().add_auto_file(file.path()).build().unwrap();
    let app = Application::init(
        Application::builder()
            .config(service.clone())
            .provider(ConfigServiceProvider::entry(service))
            .provider(ProviderEntry::eager("mail", |_| Box::new(MailProvider))),
    )
    .unwrap();

    assert_eq!(app.policy(), ResolutionPolicy::Transient);
    assert_eq!(app.container().get::<Mailer>("mailer").unwrap().transport, "ses");
}
