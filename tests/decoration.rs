mod common;

use common::{ctor, lower, statements, ty};
use ferrous_inject::{
    DecoratorResolver, DecoratorSource, Disposability, InstanceSource, Method, Parameter, ProviderCollection, Scope,
    TypeKey,
};

fn logging_decorator(target: &str) -> DecoratorSource {
    DecoratorSource::registration(
        Method::constructor(ty(&format!("Logging{}", target)), [Parameter::required("inner", ty(target))]),
        ty(target),
        0,
    )
}

fn wrapper_decorator() -> DecoratorSource {
    let t = TypeKey::param("T");
    let wrapper = TypeKey::generic("Wrapper", [t.clone()]);
    DecoratorSource::factory_method(
        Method::function(
            ty("Decorators"),
            "trace",
            [Parameter::required("inner", wrapper.clone()), Parameter::required("tag", ty("Tag"))],
            wrapper,
        )
        .with_type_arguments([t]),
        0,
    )
}

#[test]
fn test_first_declared_decorator_is_innermost() {
    let retry = DecoratorSource::registration(
        Method::constructor(ty("Retry"), [Parameter::required("inner", ty("Client"))]),
        ty("Client"),
        0,
    );
    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor("Client", &[]))
        .add_decorator(logging_decorator("Client"))
        .add_decorator(retry);
    let env = services.build();

    let outer = env.lookup(&ty("Client")).unwrap();
    let InstanceSource::Decorated { decorator, underlying } = &*outer else {
        panic!("expected decorated source");
    };
    assert_eq!(decorator.to_string(), "decorator Retry.new(Client)");
    let InstanceSource::Decorated { decorator, underlying } = &**underlying else {
        panic!("expected two decorators");
    };
    assert_eq!(decorator.to_string(), "decorator LoggingClient.new(Client)");
    assert_eq!(underlying.kind(), "Registration");
    assert_eq!(outer.scope(), Scope::InstancePerResolution);
}

#[test]
fn test_open_generic_decorator_unifies() {
    let resolver = DecoratorResolver::new([wrapper_decorator(), logging_decorator("Client")]);

    let concrete = TypeKey::generic("Wrapper", [ty("int")]);
    let matches: Vec<_> = resolver.decorators_for(&concrete).iter().collect();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].decorated_type(), &concrete);
    assert_eq!(matches[0].parameters()[0].ty, concrete);
    assert!(!matches[0].is_open_generic());

    assert!(!resolver.decorators_for(&TypeKey::generic("Other", [ty("int")])).any());
    assert!(resolver.decorators_for(&ty("Client")).any());
    assert!(!resolver.decorators_for(&ty("Server")).any());
}

#[test]
fn test_decorated_lowering_binds_underlying() {
    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor("Tag", &[]))
        .add_factory_method(
            Method::function(ty("Module"), "wrapped", [], TypeKey::generic("Wrapper", [ty("int")])),
            Scope::InstancePerResolution,
        )
        .add_decorator(wrapper_decorator());
    let env = services.build();

    let plan = lower(&env, &TypeKey::generic("Wrapper", [ty("int")]), false);
    assert_eq!(
        statements(&plan),
        [
            "wrapper_int_0_1 = Module.wrapped()",
            "tag_0_2 = Tag::new()",
            "wrapper_int_0_0 = Decorators.trace(wrapper_int_0_1, tag_0_2)",
        ]
    );
    assert_eq!(plan.target, "wrapper_int_0_0");
}

#[test]
fn test_delegate_parameters_are_not_decorated() {
    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor("Client", &[]))
        .add_decorator(logging_decorator("Client"));
    let env = services.build();

    let delegate = env.lookup(&TypeKey::delegate([ty("Client")], ty("Client"))).unwrap();
    let body = env.enter(&delegate);
    assert_eq!(body.lookup(&ty("Client")).unwrap().kind(), "DelegateParameter");
    assert_eq!(env.lookup(&ty("Client")).unwrap().kind(), "Decorated");
}

#[test]
fn test_decorator_disposal_only_when_requested() {
    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor("Client", &[]))
        .add_decorator(logging_decorator("Client").with_dispose(Disposability::Sync));
    let plan = lower(&services.build(), &ty("Client"), false);
    let disposed: Vec<_> = plan.disposal_order().map(|op| op.statement.to_string()).collect();
    assert_eq!(disposed, ["client_0_0 = LoggingClient::new(client_0_1)"]);

    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor("Client", &[]))
        .add_decorator(logging_decorator("Client"));
    let plan = lower(&services.build(), &ty("Client"), false);
    assert_eq!(plan.disposal_order().count(), 0);
}
