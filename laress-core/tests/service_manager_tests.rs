// Provider lifecycle tests

use laress_core::{Container, Error, ProviderEntry, ProviderTable, Result, ServiceProvider};
use parking_lot::Mutex;
use std::sync::Arc;

type Journal = Arc<Mutex<Vec<String>>>;

/// Records its hooks into a shared journal and binds one value
struct JournalProvider {
    name: &'static str,
    binding: &'static str,
    journal: Journal,
    fail_boot: bool,
}

impl ServiceProvider for JournalProvider {
    fn register(&self, container: &Container) -> Result<()> {
        self.journal.lock().push(format!("{}:register", self.name));
        let name = self.name;
        container.singleton(self.binding, move |_| Ok(name.to_string()));
        Ok(())
    }

    fn boot(&self, _container: &Container) -> Result<()> {
        self.journal.lock().push(format!("{}:boot", self.name));
        if self.fail_boot {
            return Err(Error::provider(self.name, "boot failed"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn provider(
    name: &'static str,
    binding: &'static str,
    journal: &Journal,
) -> impl Fn(&Container) -> Box<dyn ServiceProvider> + Send + Sync + 'static {
    let journal = journal.clone();
    move |_| {
        journal.lock().push(format!("{}:new", name));
        Box::new(JournalProvider {
            name,
            binding,
            journal: journal.clone(),
            fail_boot: false,
        })
    }
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().clone()
}

#[test]
fn test_eager_and_deferred_end_to_end() {
    let container = Container::new();
    let journal = Journal::default();
    container
        .services()
        .set_providers(
            ProviderTable::new()
                .eager("A", provider("A", "a", &journal))
                .deferred("B", "x", provider("B", "x", &journal)),
        )
        .unwrap();

    container.services().boot().unwrap();

    let a = container.services().provider("A").unwrap();
    assert!(a.is_registered());
    assert!(a.is_booted());
    assert!(container.services().provider("B").is_none());
    assert!(!container.services().is_service_loaded("x"));

    assert_eq!(*container.get::<String>("x").unwrap(), "B");

    let b = container.services().provider("B").unwrap();
    assert!(b.is_registered());
    assert!(b.is_booted());
    assert!(container.services().is_service_loaded("x"));
    assert_eq!(
        entries(&journal),
        ["A:new", "A:register", "A:boot", "B:new", "B:register", "B:boot"]
    );
}

#[test]
fn test_deferred_provider_loads_on_first_lookup_only() {
    let container = Container::new();
    let journal = Journal::default();
    container
        .services()
        .set_providers(ProviderTable::new().deferred("routing", "redirect", provider("routing", "redirect", &journal)))
        .unwrap();

    assert!(!container.services().is_service_loaded("redirect"));
    assert!(container.has("redirect"));

    container.get::<String>("redirect").unwrap();
    container.get::<String>("redirect").unwrap();

    assert!(container.services().is_service_loaded("redirect"));
    // The manager has not booted, so on-demand activation only registers
    assert_eq!(entries(&journal), ["routing:new", "routing:register"]);
}

#[test]
fn test_register_before_boot_across_providers() {
    let container = Container::new();
    let journal = Journal::default();
    container
        .services()
        .set_providers(
            ProviderTable::new()
                .eager("first", provider("first", "one", &journal))
                .eager("second", provider("second", "two", &journal)),
        )
        .unwrap();

    container.services().boot().unwrap();
    container.services().boot().unwrap();

    assert_eq!(
        entries(&journal),
        [
            "first:new",
            "first:register",
            "second:new",
            "second:register",
            "first:boot",
            "second:boot",
        ]
    );
}

#[test]
fn test_boot_may_resolve_other_providers_bindings() {
    struct Consumer {
        seen: Journal,
    }

    impl ServiceProvider for Consumer {
        fn register(&self, _container: &Container) -> Result<()> {
            Ok(())
        }

        fn boot(&self, container: &Container) -> Result<()> {
            let value = container.get::<String>("lazy")?;
            self.seen.lock().push(format!("consumer saw {}", value));
            Ok(())
        }
    }

    let container = Container::new();
    let journal = Journal::default();
    let seen = journal.clone();
    container
        .services()
        .set_providers(
            ProviderTable::new()
                .eager("consumer", move |_| Box::new(Consumer { seen: seen.clone() }))
                .deferred("lazy", "lazy", provider("lazy", "lazy", &journal)),
        )
        .unwrap();

    container.services().boot().unwrap();

    // The deferred provider activated mid-boot is booted by the same pass
    assert!(container.services().provider("lazy").unwrap().is_booted());
    assert_eq!(
        entries(&journal),
        ["lazy:new", "lazy:register", "consumer saw lazy", "lazy:boot"]
    );
}

#[test]
fn test_boot_failure_keeps_registered_flag() {
    let container = Container::new();
    let journal = Journal::default();
    let log = journal.clone();
    container
        .services()
        .set_providers(ProviderTable::new().eager("fragile", move |_| {
            Box::new(JournalProvider {
                name: "fragile",
                binding: "fragile",
                journal: log.clone(),
                fail_boot: true,
            })
        }))
        .unwrap();

    let err = container.services().boot().unwrap_err();
    assert!(matches!(err, Error::Provider { ref provider, .. } if provider == "fragile"));

    let handle = container.services().provider("fragile").unwrap();
    assert!(handle.is_registered());
    assert!(!handle.is_booted());
    assert!(container.services().is_registered());
    assert!(!container.services().is_booted());

    // Retrying boot does not register again
    assert!(container.services().boot().is_err());
    assert_eq!(
        entries(&journal),
        ["fragile:register", "fragile:boot", "fragile:boot"]
    );
}

#[test]
fn test_register_failure_propagates() {
    struct Broken;

    impl ServiceProvider for Broken {
        fn register(&self, _container: &Container) -> Result<()> {
            Err(Error::provider("broken", "missing credentials"))
        }
    }

    let container = Container::new();
    container
        .services()
        .set_providers(ProviderTable::new().eager("broken", |_| Box::new(Broken)))
        .unwrap();

    assert!(container.services().register().is_err());
    assert!(!container.services().is_registered());
    assert!(!container.services().provider("broken").unwrap().is_registered());
}

#[test]
fn test_duplicate_service_registration_is_fatal() {
    let container = Container::new();
    let journal = Journal::default();
    let services = container.services();

    services
        .add_provider(ProviderEntry::deferred("session", "session", provider("session", "session", &journal)))
        .unwrap();
    let err = services
        .add_provider(ProviderEntry::eager("session", provider("session", "session", &journal)))
        .unwrap_err();

    assert!(matches!(err, Error::DuplicateServiceRegistration(_)));
    assert_eq!(services.provider_count(), 1);
}

#[test]
fn test_register_service_by_name_for_eager_provider_before_register_pass() {
    let container = Container::new();
    let journal = Journal::default();
    container
        .services()
        .set_providers(ProviderTable::new().eager("cache", provider("cache", "cache", &journal)))
        .unwrap();

    assert!(container.services().register_service_by_name("cache").unwrap());
    container.services().register().unwrap();

    assert_eq!(entries(&journal), ["cache:new", "cache:register"]);
    assert_eq!(container.services().loaded_names(), ["cache"]);
}

#[test]
fn test_register_skips_provider_already_loaded_under_its_name() {
    let container = Container::new();
    let journal = Journal::default();
    let services = container.services();
    services
        .set_providers(ProviderTable::new().deferred("svc", "x", provider("svc", "x", &journal)))
        .unwrap();
    assert_eq!(*container.get::<String>("x").unwrap(), "svc");

    assert!(
        services
            .set_providers(ProviderTable::new().eager("svc", provider("svc", "x", &journal)))
            .unwrap()
    );
    services.register().unwrap();

    assert!(services.is_registered());
    assert_eq!(services.loaded_names(), ["x"]);
    assert_eq!(entries(&journal), ["svc:new", "svc:register"]);
}

#[test]
fn test_failed_deferred_register_is_retried_on_next_lookup() {
    struct Flaky {
        attempts: Journal,
    }

    impl ServiceProvider for Flaky {
        fn register(&self, container: &Container) -> Result<()> {
            let mut attempts = self.attempts.lock();
            attempts.push("register".to_string());
            if attempts.len() == 1 {
                return Err(Error::provider("mailer", "smtp unreachable"));
            }
            container.singleton("mailer", |_| Ok("smtp".to_string()));
            Ok(())
        }
    }

    let container = Container::new();
    let attempts = Journal::default();
    let seen = attempts.clone();
    container
        .services()
        .set_providers(ProviderTable::new().deferred("mail", "mailer", move |_| {
            Box::new(Flaky {
                attempts: seen.clone(),
            })
        }))
        .unwrap();

    let err = container.get::<String>("mailer").unwrap_err();
    assert!(matches!(err, Error::Provider { ref provider, .. } if provider == "mailer"));
    assert!(!container.services().is_service_loaded("mailer"));

    assert_eq!(*container.get::<String>("mailer").unwrap(), "smtp");
    assert_eq!(entries(&attempts), ["register", "register"]);
}
