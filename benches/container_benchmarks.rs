use criterion::{Criterion, criterion_group, criterion_main};
use laress::*;
use std::hint::black_box;

struct Database {
    dsn: String,
}

struct DatabaseProvider;

impl ServiceProvider for DatabaseProvider {
    fn register(&self, container: &Container) -> Result<()> {
        container.singleton("db", |_| {
            Ok(Database {
                dsn: "postgres://localhost/app".to_string(),
            })
        });
        Ok(())
    }
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    let container = Container::new();
    container.singleton("db", |_| {
        Ok(Database {
            dsn: "postgres://localhost/app".to_string(),
        })
    });
    container.get::<Database>("db").unwrap();

    group.bench_function("cached_singleton", |b| {
        b.iter(|| container.get::<Database>(black_box("db")).unwrap())
    });

    let transient = Container::with_policy(ResolutionPolicy::Transient);
    transient.bind("id", |_| Ok(42u64));

    group.bench_function("transient_resolver", |b| {
        b.iter(|| transient.get::<u64>(black_box("id")).unwrap())
    });

    let child = container.child();
    group.bench_function("parent_fallback", |b| {
        b.iter(|| child.get::<Database>(black_box("db")).unwrap().dsn.len())
    });

    group.bench_function("miss", |b| {
        b.iter(|| container.get_optional::<u64>(black_box("missing")).unwrap())
    });

    group.finish();
}

fn bench_request_scope(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_scope");

    let app = Application::init(
        Application::builder()
            .providers(ProviderTable::new().eager("db", |_| Box::new(DatabaseProvider)))
            .request_providers(
                ProviderTable::new().deferred("db.request", "request_db", |_| Box::new(DatabaseProvider)),
            ),
    )
    .unwrap();

    group.bench_function("open", |b| {
        b.iter(|| app.create_request(HttpRequest::new("GET", "/")).unwrap())
    });

    group.bench_function("open_and_resolve_app_singleton", |b| {
        b.iter(|| {
            let scope = app.create_request(HttpRequest::new("GET", "/")).unwrap();
            scope.get::<Database>("db").unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_resolution, bench_request_scope);
criterion_main!(benches);
