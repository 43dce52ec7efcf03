mod common;

use std::collections::HashSet;

use common::{check, ctor, lower, lower_emission_order, ty};
use ferrous_inject::{Disposability, Plan, ProviderCollection, ProviderOptions, Scope, Statement};
use proptest::prelude::*;

/// Per node: dependency mask over later nodes, scope, disposable, asynchronous.
type NodeSpec = (u8, u8, bool, bool);

fn node_name(i: usize) -> String {
    format!("N{}", i)
}

/// Builds an acyclic container: node `i` may only depend on nodes `j > i`.
fn build(nodes: &[NodeSpec], allow_async: bool) -> ProviderCollection {
    let mut services = ProviderCollection::new();
    for (i, &(mask, scope, disposable, is_async)) in nodes.iter().enumerate() {
        let deps: Vec<String> = (i + 1..nodes.len())
            .filter(|j| mask & (1 << ((j - i - 1) % 8)) != 0)
            .map(node_name)
            .collect();
        let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
        let scope = match scope % 3 {
            0 => Scope::InstancePerDependency,
            1 => Scope::InstancePerResolution,
            _ => Scope::SingleInstance,
        };
        let mut options = ProviderOptions::new();
        if disposable {
            options = options.disposable(Disposability::Both);
        }
        if allow_async && is_async {
            options = options.asynchronous();
        }
        services.add_registration_with(ctor(&node_name(i), &deps), scope, options);
    }
    services
}

fn node_specs() -> impl Strategy<Value = Vec<NodeSpec>> {
    prop::collection::vec((any::<u8>(), 0u8..3, any::<bool>(), any::<bool>()), 1..9)
}

fn ids(plan: &Plan) -> Vec<usize> {
    plan.operations.iter().map(|op| op.id).collect()
}

proptest! {
    #[test]
    fn test_sync_plans_are_topologically_ordered(nodes in node_specs()) {
        let env = build(&nodes, false).build();
        let (has_errors, _) = check(&env, "N0", false);
        prop_assert!(!has_errors);

        let plan = lower(&env, &ty("N0"), false);
        prop_assert!(plan.is_topologically_ordered());
        prop_assert!(!plan.is_empty());
    }

    #[test]
    fn test_disposal_is_exact_reverse_of_creation(nodes in node_specs()) {
        let plan = lower(&build(&nodes, false).build(), &ty("N0"), false);

        let mut created: Vec<usize> =
            plan.operations.iter().filter(|op| op.disposal.is_some()).map(|op| op.id).collect();
        created.reverse();
        let disposed: Vec<usize> = plan.disposal_order().map(|op| op.id).collect();
        prop_assert_eq!(created, disposed);
    }

    #[test]
    fn test_per_resolution_values_are_created_once(nodes in node_specs()) {
        let plan = lower(&build(&nodes, false).build(), &ty("N0"), false);

        let mut seen = HashSet::new();
        for op in &plan.operations {
            if let Statement::DependencyCreation { source, .. } = &op.statement {
                if source.scope() != Scope::InstancePerDependency {
                    prop_assert!(seen.insert(source.of_type().clone()), "{} created twice", source.of_type());
                }
            }
        }
    }

    #[test]
    fn test_scheduler_permutes_async_plans(nodes in node_specs()) {
        let env = build(&nodes, true).build();
        let (has_errors, _) = check(&env, "N0", true);
        prop_assert!(!has_errors);

        let scheduled = lower(&env, &ty("N0"), true);
        let emitted = lower_emission_order(&env, &ty("N0"), true);
        prop_assert!(scheduled.is_topologically_ordered());
        prop_assert!(emitted.is_topologically_ordered());
        prop_assert_eq!(&scheduled.target, &emitted.target);

        let mut scheduled_ids = ids(&scheduled);
        let mut emitted_ids = ids(&emitted);
        scheduled_ids.sort_unstable();
        emitted_ids.sort_unstable();
        prop_assert_eq!(scheduled_ids, emitted_ids);
    }
}
