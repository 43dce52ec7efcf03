mod common;

use std::sync::Arc;

use common::{ctor, lower, lower_emission_order, statements, ty};
use ferrous_inject::{
    DecoratorSource, EmissionOrder, LongestSuspensionChain, Method, Operation, OperationRef, Parameter, ProviderCollection,
    ProviderOptions, Scheduler, Scope, Statement, TypeKey,
};

fn async_factory(services: &mut ProviderCollection, name: &str, deps: &[&str]) {
    let parameters: Vec<_> = deps.iter().map(|dep| Parameter::required(&dep.to_lowercase(), ty(dep))).collect();
    services.add_factory_method_with(
        Method::function(ty("Module"), &name.to_lowercase(), parameters, ty(name)),
        Scope::InstancePerResolution,
        ProviderOptions::new().asynchronous(),
    );
}

/// `Root(X2, Y)` where `X2` awaits `X1` and every factory is asynchronous.
fn chained() -> ProviderCollection {
    let mut services = ProviderCollection::new();
    services.add_per_resolution(ctor("Root", &["X2", "Y"]));
    async_factory(&mut services, "X1", &[]);
    async_factory(&mut services, "X2", &["X1"]);
    async_factory(&mut services, "Y", &[]);
    services
}

#[test]
fn test_independent_suspensions_start_first() {
    let mut services = ProviderCollection::new();
    services.add_per_resolution(ctor("Root", &["X", "Y"])).add_per_resolution(ctor("Y", &["Z"]));
    async_factory(&mut services, "X", &[]);
    async_factory(&mut services, "Z", &[]);
    let env = services.build();

    assert_eq!(
        statements(&lower(&env, &ty("Root"), true)),
        [
            "x_0_2 = Module.x()",
            "z_0_5 = Module.z()",
            "x_0_1 = await x_0_2",
            "z_0_4 = await z_0_5",
            "y_0_3 = Y::new(z_0_4)",
            "root_0_0 = Root::new(x_0_1, y_0_3)",
        ]
    );
    assert_eq!(
        statements(&lower_emission_order(&env, &ty("Root"), true)),
        [
            "x_0_2 = Module.x()",
            "x_0_1 = await x_0_2",
            "z_0_5 = Module.z()",
            "z_0_4 = await z_0_5",
            "y_0_3 = Y::new(z_0_4)",
            "root_0_0 = Root::new(x_0_1, y_0_3)",
        ]
    );
}

#[test]
fn test_longest_await_chain_is_forced_first() {
    let plan = lower(&chained().build(), &ty("Root"), true);
    assert_eq!(
        statements(&plan),
        [
            "x1_0_3 = Module.x1()",
            "y_0_6 = Module.y()",
            "x1_0_2 = await x1_0_3",
            "x2_0_4 = Module.x2(x1_0_2)",
            "x2_0_1 = await x2_0_4",
            "y_0_5 = await y_0_6",
            "root_0_0 = Root::new(x2_0_1, y_0_5)",
        ]
    );
    assert!(plan.is_topologically_ordered());
}

#[test]
fn test_sync_resolution_keeps_emission_order() {
    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor("Root", &["A", "B"]))
        .add_per_resolution(ctor("A", &[]))
        .add_per_resolution(ctor("B", &[]));
    let plan = lower(&services.build(), &ty("Root"), false);
    assert_eq!(statements(&plan), ["a_0_1 = A::new()", "b_0_2 = B::new()", "root_0_0 = Root::new(a_0_1, b_0_2)"]);
}

fn await_op(id: usize, dependencies: Vec<OperationRef>) -> OperationRef {
    Arc::new(Operation {
        id,
        statement: Statement::Await { variable: None, task: format!("t{}", id), ty: None },
        disposal: None,
        dependencies,
        can_dispose_locally: false,
    })
}

#[test]
fn test_out_of_plan_dependencies_count_as_available() {
    let outer = await_op(100, Vec::new());
    let inner = await_op(0, vec![outer]);
    let scheduled = LongestSuspensionChain.schedule(vec![inner.clone()]).unwrap();
    assert_eq!(scheduled, [inner]);
}

#[test]
fn test_scheduler_names() {
    assert_eq!(LongestSuspensionChain.name(), "longest_suspension_chain");
    assert_eq!(EmissionOrder.name(), "emission_order");

    let ops = vec![await_op(0, Vec::new()), await_op(1, Vec::new())];
    let ids: Vec<_> = EmissionOrder.schedule(ops).unwrap().iter().map(|op| op.id).collect();
    assert_eq!(ids, [0, 1]);
}

#[test]
fn test_async_decorator_starts_suspension() {
    let t = TypeKey::param("T");
    let mut services = ProviderCollection::new();
    services.add_per_resolution(ctor("Client", &[])).add_decorator(
        DecoratorSource::factory_method(
            Method::function(ty("Decorators"), "warm", [Parameter::required("inner", t.clone())], t.clone())
                .with_type_arguments([t]),
            0,
        )
        .with_async(),
    );
    let plan = lower(&services.build(), &ty("Client"), true);
    assert!(plan.operations.iter().any(|op| op.statement.starts_suspension()));
    assert_eq!(statements(&plan).last().map(String::as_str), Some("client_0_0 = await client_0_2"));
}
