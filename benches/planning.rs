use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_inject::*;

// ===== Fixtures =====

fn named(i: usize) -> TypeKey {
    TypeKey::named(&format!("Service{}", i))
}

/// A layered graph: every service depends on the next `fan_out` services.
fn layered(services: usize, fan_out: usize, scope: Scope) -> Environment {
    let mut collection = ProviderCollection::new();
    for i in 0..services {
        let parameters = (i + 1..services.min(i + 1 + fan_out)).map(|j| Parameter::required(&format!("s{}", j), named(j)));
        collection.add_registration(Method::constructor(named(i), parameters), scope);
    }
    collection.build()
}

// ===== Benchmarks =====

fn bench_check(c: &mut Criterion) {
    let env = layered(64, 3, Scope::InstancePerResolution);
    let checker = DependencyChecker::new(&env);

    c.bench_function("check_layered_64", |b| {
        b.iter(|| {
            let mut diagnostics: Vec<Diagnostic> = Vec::new();
            let has_errors = checker.check(&named(0), false, &mut diagnostics).unwrap();
            black_box(has_errors);
        })
    });
}

fn bench_lower_by_scope(c: &mut Criterion) {
    let mut group = c.benchmark_group("lower_by_scope");
    for (label, scope) in [
        ("per_resolution", Scope::InstancePerResolution),
        ("single_instance", Scope::SingleInstance),
    ] {
        let env = layered(64, 3, scope);
        let root = env.lookup(&named(0)).unwrap();
        let config = PlannerConfig::default();
        let cancel = CancellationToken::new();
        group.bench_function(label, |b| {
            b.iter(|| {
                let plan = lower_resolution(&root, &env, false, &config, &cancel).unwrap();
                black_box(plan.len());
            })
        });
    }
    group.finish();
}

fn bench_schedulers(c: &mut Criterion) {
    let mut collection = ProviderCollection::new();
    let services = 32;
    for i in 0..services {
        let parameters = (i + 1..services.min(i + 3)).map(|j| Parameter::required(&format!("s{}", j), named(j)));
        collection.add_registration_with(
            Method::constructor(named(i), parameters),
            Scope::InstancePerResolution,
            ProviderOptions::new().asynchronous(),
        );
    }
    let env = collection.build();
    let root = env.lookup(&named(0)).unwrap();
    let cancel = CancellationToken::new();

    let mut group = c.benchmark_group("schedulers");
    for kind in [SchedulerKind::EmissionOrder, SchedulerKind::LongestSuspensionChain] {
        let config = PlannerConfig::new().with_scheduler(kind);
        group.bench_with_input(BenchmarkId::from_parameter(kind.scheduler().name()), &config, |b, config| {
            b.iter(|| {
                let plan = lower_resolution(&root, &env, true, config, &cancel).unwrap();
                black_box(plan.len());
            })
        });
    }
    group.finish();
}

fn bench_container(c: &mut Criterion) {
    let env = layered(48, 2, Scope::SingleInstance);
    let roots: Vec<_> = (0..8).map(|i| RootRequest::sync(named(i))).collect();

    c.bench_function("container_plan_48_singletons", |b| {
        b.iter(|| {
            let plan = ContainerPlanner::new(&env).plan(&roots).unwrap();
            black_box(plan.singletons.len());
        })
    });
}

criterion_group!(benches, bench_check, bench_lower_by_scope, bench_schedulers, bench_container);
criterion_main!(benches);
