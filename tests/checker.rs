mod common;

use common::{check, ctor, ctor_with, ty};
use ferrous_inject::{
    DependencyChecker, Diagnostic, DiagnosticKind, FnSink, Location, Method, Parameter, ProviderCollection, ProviderOptions,
    Scope, TracingSink, TypeKey,
};

fn per_resolution(names: &[(&str, &[&str])]) -> ProviderCollection {
    let mut services = ProviderCollection::new();
    for (name, deps) in names {
        services.add_per_resolution(ctor(name, deps));
    }
    services
}

fn offending(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| d.offending.to_string()).collect()
}

#[test]
fn test_no_error_for_correct_dependencies() {
    let env = per_resolution(&[("A", &["B", "C"]), ("B", &["C", "D"]), ("C", &[]), ("D", &["C"])]).build();
    let (has_errors, diagnostics) = check(&env, "A", true);
    assert!(!has_errors);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_ignores_errors_in_unused_dependencies() {
    // A needs an unregistered E, but only B is requested.
    let env = per_resolution(&[("A", &["B", "C", "E"]), ("B", &["C", "D"]), ("C", &[]), ("D", &["C"])]).build();
    let (has_errors, diagnostics) = check(&env, "B", true);
    assert!(!has_errors);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_circular_dependency_through_sibling() {
    let env = per_resolution(&[("A", &["B", "C"]), ("B", &["C", "D"]), ("C", &["B"]), ("D", &["C"])]).build();
    let (has_errors, diagnostics) = check(&env, "A", true);
    assert!(has_errors);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::CircularDependency);
    assert_eq!(diagnostics[0].code(), "DI0101");
    assert_eq!(
        diagnostics[0].message(),
        "Error while resolving dependencies for 'A': 'B' has a circular dependency"
    );
}

#[test]
fn test_self_dependency() {
    let env = per_resolution(&[("A", &["B", "C"]), ("B", &["C", "D"]), ("C", &["C"]), ("D", &["C"])]).build();
    let (has_errors, diagnostics) = check(&env, "A", true);
    assert!(has_errors);
    assert_eq!(offending(&diagnostics), ["C"]);
}

#[test]
fn test_root_depends_on_itself() {
    let env = per_resolution(&[("A", &["B", "C", "A"]), ("B", &["C", "D"]), ("C", &[]), ("D", &["C"])]).build();
    let (has_errors, diagnostics) = check(&env, "A", true);
    assert!(has_errors);
    assert_eq!(offending(&diagnostics), ["A"]);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::CircularDependency);
}

#[test]
fn test_missing_dependency() {
    let env = per_resolution(&[("A", &["B", "C"]), ("B", &["C", "D"]), ("C", &[])]).build();
    let (has_errors, diagnostics) = check(&env, "A", true);
    assert!(has_errors);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code(), "DI0102");
    assert_eq!(
        diagnostics[0].message(),
        "Error while resolving dependencies for 'A': We have no source for instance of type 'D'"
    );
}

#[test]
fn test_reports_all_missing_dependencies() {
    let env = per_resolution(&[("A", &["B", "C"]), ("B", &["C", "D"])]).build();
    let (_, diagnostics) = check(&env, "A", true);
    assert_eq!(offending(&diagnostics), ["C", "D"]);
}

#[test]
fn test_missing_dependencies_in_traversal_order() {
    let env = per_resolution(&[("A", &["B", "C"]), ("B", &["D", "E"])]).build();
    let (_, diagnostics) = check(&env, "A", true);
    assert_eq!(offending(&diagnostics), ["D", "E", "C"]);
    assert!(diagnostics.iter().all(|d| d.kind == DiagnosticKind::MissingDependency));
}

#[test]
fn test_cycle_does_not_report_spurious_missing() {
    let env = per_resolution(&[("A", &["B"]), ("B", &["C"]), ("C", &["B"])]).build();
    let (_, diagnostics) = check(&env, "A", false);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::CircularDependency);
    assert_eq!(offending(&diagnostics), ["B"]);
}

#[test]
fn test_optional_parameter_may_be_missing() {
    let mut services = ProviderCollection::new();
    services.add_per_resolution(ctor_with("A", vec![Parameter::optional("logger", ty("Logger"))]));
    let (has_errors, _) = check(&services.build(), "A", false);
    assert!(!has_errors);
}

#[test]
fn test_ambiguous_dependency() {
    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor("A", &["Store"]))
        .add_per_resolution(ctor("Store", &[]))
        .add_factory_method(Method::function(ty("Module"), "store", [], ty("Store")), Scope::InstancePerResolution);
    let (has_errors, diagnostics) = check(&services.build(), "A", false);
    assert!(has_errors);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::AmbiguousDependency);
    assert_eq!(diagnostics[0].candidates, 2);
    assert_eq!(diagnostics[0].code(), "DI0106");
}

#[test]
fn test_async_provider_from_sync_root() {
    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor("A", &["B"]))
        .add_registration_with(ctor("B", &[]), Scope::InstancePerResolution, ProviderOptions::new().asynchronous());
    let env = services.build();

    let (has_errors, diagnostics) = check(&env, "A", false);
    assert!(has_errors);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::RequiresAsync);
    assert_eq!(
        diagnostics[0].message(),
        "Error while resolving dependencies for 'A': 'B' can only be resolved asynchronously."
    );

    let (has_errors, _) = check(&env, "A", true);
    assert!(!has_errors);
}

#[test]
fn test_async_delegate_allows_async_body_in_sync_root() {
    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor_with(
            "A",
            vec![Parameter::required("make_b", TypeKey::async_delegate([], ty("B")))],
        ))
        .add_registration_with(ctor("B", &[]), Scope::InstancePerResolution, ProviderOptions::new().asynchronous());
    let (has_errors, diagnostics) = check(&services.build(), "A", false);
    assert!(!has_errors, "{:?}", diagnostics);
}

#[test]
fn test_delegate_breaks_cycle() {
    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor_with("A", vec![Parameter::required("b", TypeKey::delegate([], ty("B")))]))
        .add_per_resolution(ctor("B", &["A"]));
    let (has_errors, diagnostics) = check(&services.build(), "A", false);
    assert!(!has_errors, "{:?}", diagnostics);
}

#[test]
fn test_delegate_parameter_satisfies_dependency() {
    let mut services = ProviderCollection::new();
    services
        .add_per_resolution(ctor_with(
            "Handler",
            vec![Parameter::required("factory", TypeKey::delegate([ty("Request")], ty("Worker")))],
        ))
        .add_per_resolution(ctor("Worker", &["Request"]));
    let env = services.build();
    let (has_errors, _) = check(&env, "Handler", false);
    assert!(!has_errors);
    let (has_errors, diagnostics) = check(&env, "Worker", false);
    assert!(has_errors);
    assert_eq!(offending(&diagnostics), ["Request"]);
}

#[test]
fn test_location_and_sinks() {
    let env = per_resolution(&[("A", &["Missing"])]).build();
    let checker = DependencyChecker::new(&env).with_location(Location::new("container.rs", 8, 14));

    let mut seen: Vec<Diagnostic> = Vec::new();
    let mut sink = FnSink(|d: Diagnostic| seen.push(d));
    assert!(checker.check(&ty("A"), false, &mut sink).unwrap());
    drop(sink);
    assert_eq!(seen[0].to_string(), format!("container.rs:8:14: error DI0102: {}", seen[0].message()));

    let mut tracing_sink = TracingSink::new();
    checker.check(&ty("A"), false, &mut tracing_sink).unwrap();
    assert_eq!(tracing_sink.reported(), 1);
}
