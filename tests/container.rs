mod common;

use common::{ctor, ctor_with, statements, ty};
use ferrous_inject::{
    CancellationToken, ContainerPlanner, DiagnosticKind, Disposability, Disposal, Member, Parameter, PlanError,
    ProviderCollection, ProviderOptions, RootRequest, Scope, TypeKey,
};

fn disposable_singleton(services: &mut ProviderCollection, name: &str, deps: &[&str]) {
    services.add_registration_with(
        ctor(name, deps),
        Scope::SingleInstance,
        ProviderOptions::new().disposable(Disposability::Both),
    );
}

/// `Handler(Cache)`, with singletons `Cache(Pool, Clock)`, `Pool(Clock)`, `Clock()`.
fn layered() -> ProviderCollection {
    let mut services = ProviderCollection::new();
    services.add_per_resolution(ctor("Handler", &["Cache"]));
    disposable_singleton(&mut services, "Cache", &["Pool", "Clock"]);
    disposable_singleton(&mut services, "Pool", &["Clock"]);
    disposable_singleton(&mut services, "Clock", &[]);
    services
}

fn type_names<'a>(accessors: impl Iterator<Item = &'a ferrous_inject::SingletonAccessor>) -> Vec<String> {
    accessors.map(|accessor| accessor.source.of_type().to_string()).collect()
}

#[test]
fn test_singletons_are_created_after_their_dependencies() {
    let env = layered().build();
    let plan = ContainerPlanner::new(&env).plan(&[RootRequest::sync(ty("Handler"))]).unwrap();

    assert_eq!(type_names(plan.singletons.iter()), ["Cache", "Pool", "Clock"]);
    assert_eq!(type_names(plan.creation_order()), ["Clock", "Pool", "Cache"]);
    assert_eq!(type_names(plan.disposal_order()), ["Cache", "Pool", "Clock"]);

    let cache = plan.singleton(&ty("Cache")).unwrap();
    assert_eq!(cache.dependencies.iter().copied().collect::<Vec<_>>(), [1, 2]);
    assert_eq!(cache.names.accessor, "get_cache_field0");
    assert_eq!(
        statements(&cache.plan),
        [
            "pool_0_1 = single_instance<Pool>()",
            "clock_0_2 = single_instance<Clock>()",
            "cache_0_0 = Cache::new(pool_0_1, clock_0_2)",
        ]
    );
    // Dual-flavour singletons follow the container's disposal style.
    assert_eq!(
        cache.plan.operations[2].disposal,
        Some(Disposal::Interface { variable: "cache_0_0".to_string(), is_async: false })
    );
    assert!(!plan.is_async_disposal);
}

#[test]
fn test_async_root_makes_disposal_async() {
    let env = layered().build();
    let plan = ContainerPlanner::new(&env)
        .plan(&[RootRequest::sync(ty("Handler")), RootRequest::asynchronous(ty("Handler"))])
        .unwrap();

    assert!(plan.is_async_disposal);
    assert_eq!(plan.singletons.len(), 3);
    let clock = plan.singleton(&ty("Clock")).unwrap();
    assert_eq!(clock.plan.operations[0].disposal.as_ref().map(Disposal::is_async), Some(true));
}

#[test]
fn test_failing_root_becomes_stub() {
    let mut services = layered();
    services.add_per_resolution(ctor("Broken", &["Missing"]));
    let env = services.build();
    let plan = ContainerPlanner::new(&env)
        .plan(&[RootRequest::sync(ty("Broken")), RootRequest::sync(ty("Handler"))])
        .unwrap();

    let stubs: Vec<_> = plan.stubbed_roots().collect();
    assert_eq!(stubs.len(), 1);
    assert_eq!(stubs[0].request.ty, ty("Broken"));
    match &stubs[0].resolution {
        ferrous_inject::RootResolution::Stub { diagnostics } => {
            assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingDependency)
        }
        other => panic!("expected stub, got {:?}", other),
    }
    assert!(plan.roots[1].plan().is_some());
    assert_eq!(plan.singletons.len(), 3);
}

#[test]
fn test_singletons_inside_delegates_are_discovered() {
    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor_with("Handler", vec![Parameter::required("make", TypeKey::delegate([], ty("Job")))]))
        .add_per_resolution(ctor("Job", &["Queue"]))
        .add_single_instance(ctor("Queue", &[]));
    let env = services.build();
    let plan = ContainerPlanner::new(&env).plan(&[RootRequest::sync(ty("Handler"))]).unwrap();
    assert_eq!(type_names(plan.singletons.iter()), ["Queue"]);
}

#[test]
fn test_async_singleton_accessor() {
    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor("Handler", &["Client"]))
        .add_registration_with(ctor("Client", &[]), Scope::SingleInstance, ProviderOptions::new().asynchronous());
    let env = services.build();
    let plan = ContainerPlanner::new(&env).plan(&[RootRequest::asynchronous(ty("Handler"))]).unwrap();

    let client = plan.singleton(&ty("Client")).unwrap();
    assert!(client.is_async);
    assert_eq!(
        statements(&client.plan),
        ["client_0_0 = Client::new()", "client_0_1 = client_0_0.initialize_async()", "await client_0_1"]
    );
}

#[test]
fn test_requires_unsafe() {
    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor_with("Reader", vec![Parameter::required("buffer", TypeKey::pointer(ty("u8")))]))
        .add_instance(Member::new(ty("Container"), "buffer", TypeKey::pointer(ty("u8"))))
        .add_per_resolution(ctor("Safe", &[]));
    let env = services.build();

    let safe = ContainerPlanner::new(&env).plan(&[RootRequest::sync(ty("Safe"))]).unwrap();
    assert!(!safe.requires_unsafe);
    let reader = ContainerPlanner::new(&env)
        .plan(&[RootRequest::sync(ty("Safe")), RootRequest::sync(ty("Reader"))])
        .unwrap();
    assert!(reader.requires_unsafe);
}

#[test]
fn test_cancelled_planning() {
    let env = layered().build();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = ContainerPlanner::new(&env)
        .with_cancellation(cancel)
        .plan(&[RootRequest::sync(ty("Handler"))])
        .unwrap_err();
    assert_eq!(err, PlanError::Cancelled);
}
