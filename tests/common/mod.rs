//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use ferrous_inject::{
    lower_resolution, CancellationToken, DependencyChecker, Diagnostic, Environment, Method, Parameter, Plan,
    PlannerConfig, SchedulerKind, Statement, TypeKey,
};

pub fn ty(name: &str) -> TypeKey {
    TypeKey::named(name)
}

/// Constructor of `name` taking one required parameter per entry of `deps`.
pub fn ctor(name: &str, deps: &[&str]) -> Method {
    Method::constructor(ty(name), deps.iter().map(|dep| Parameter::required(&dep.to_lowercase(), ty(dep))))
}

pub fn ctor_with(name: &str, parameters: Vec<Parameter>) -> Method {
    Method::constructor(ty(name), parameters)
}

pub fn check(env: &Environment, root: &str, is_async: bool) -> (bool, Vec<Diagnostic>) {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let has_errors = DependencyChecker::new(env)
        .check(&ty(root), is_async, &mut diagnostics)
        .expect("check aborted");
    (has_errors, diagnostics)
}

pub fn lower(env: &Environment, root: &TypeKey, is_async: bool) -> Plan {
    lower_with(env, root, is_async, PlannerConfig::default())
}

pub fn lower_emission_order(env: &Environment, root: &TypeKey, is_async: bool) -> Plan {
    lower_with(env, root, is_async, PlannerConfig::new().with_scheduler(SchedulerKind::EmissionOrder))
}

pub fn lower_with(env: &Environment, root: &TypeKey, is_async: bool, config: PlannerConfig) -> Plan {
    let source = env.lookup(root).expect("root has a source");
    lower_resolution(&source, env, is_async, &config, &CancellationToken::new()).expect("lowering failed")
}

/// Rendered statements, in plan order.
pub fn statements(plan: &Plan) -> Vec<String> {
    plan.operations.iter().map(|op| op.statement.to_string()).collect()
}

/// Number of creation statements for `name` in a plan (not nested plans).
pub fn creations_of(plan: &Plan, name: &str) -> usize {
    plan.operations
        .iter()
        .filter(|op| match &op.statement {
            Statement::DependencyCreation { source, .. } => source.of_type() == &ty(name),
            _ => false,
        })
        .count()
}

/// The nested plan of the first delegate or owned-function statement.
pub fn nested_plan(plan: &Plan) -> &Plan {
    plan.operations
        .iter()
        .find_map(|op| match &op.statement {
            Statement::DelegateCreation { plan, .. } | Statement::OwnedCreationFunction { plan, .. } => Some(plan),
            _ => None,
        })
        .expect("plan has a nested plan")
}
