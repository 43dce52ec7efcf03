#![no_main]

use ferrous_inject::{
    ContainerPlanner, Disposability, Method, Parameter, PlanError, PlannerConfig, ProviderCollection,
    ProviderOptions, RootRequest, Scope, TypeKey,
};
use libfuzzer_sys::fuzz_target;

fn named(i: u8) -> TypeKey {
    TypeKey::named(&format!("S{}", i % 16))
}

// Three bytes per provider: type, scope/flags, dependency mask. Cycles,
// missing types and duplicates are all allowed; planning must never panic.
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let mut services = ProviderCollection::new();
    for chunk in data.chunks_exact(3).take(32) {
        let (ty, flags, mask) = (chunk[0], chunk[1], chunk[2]);
        let parameters = (0..8u8).filter(|bit| mask & (1 << bit) != 0).map(|bit| {
            let dep = named(ty.wrapping_add(bit + 1));
            if flags & 0x20 != 0 {
                Parameter::optional(&format!("p{}", bit), dep)
            } else {
                Parameter::required(&format!("p{}", bit), dep)
            }
        });
        let scope = match flags % 3 {
            0 => Scope::InstancePerDependency,
            1 => Scope::InstancePerResolution,
            _ => Scope::SingleInstance,
        };
        let mut options = ProviderOptions::new();
        if flags & 0x04 != 0 {
            options = options.asynchronous();
        }
        if flags & 0x08 != 0 {
            options = options.disposable(Disposability::Both);
        }
        if flags & 0x10 != 0 {
            options = options.forward_as(TypeKey::named(&format!("I{}", ty % 16)));
        }
        services.add_registration_with(Method::constructor(named(ty), parameters), scope, options);
    }
    let env = services.build();

    let roots: Vec<_> = (0..4u8)
        .map(|i| if data[0] & (1 << i) != 0 { RootRequest::asynchronous(named(i)) } else { RootRequest::sync(named(i)) })
        .collect();
    let planner = ContainerPlanner::new(&env).with_config(PlannerConfig::new().with_max_depth(64));
    match planner.plan(&roots) {
        Ok(plan) => {
            for root in &plan.roots {
                if let Some(plan) = root.plan() {
                    assert!(plan.is_topologically_ordered());
                }
            }
            assert_eq!(plan.creation_order.len(), plan.singletons.len());
        }
        Err(PlanError::DepthExceeded(_)) => {}
        Err(err) => panic!("planning failed: {}", err),
    }
});
