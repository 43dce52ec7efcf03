//! Yes/no analyses over the reachable provider graph.
//!
//! Each analysis is a [`Visitor`] over the shared traversal. Sources reached
//! from the container frame are visited at most once per walk, and recursive
//! delegates are cut off by a per-singleton-subtree visiting set.

use std::collections::{HashMap, HashSet};

use crate::cancellation::CancellationToken;
use crate::config::DEFAULT_MAX_DEPTH;
use crate::environment::Environment;
use crate::error::PlanResult;
use crate::key::TypeKey;
use crate::lifetime::Scope;
use crate::provider::{InstanceSource, SourceRef};
use crate::visit::{self, EnvSlot, Request, VisitState, Visitor};

#[derive(Clone)]
struct SimpleState {
    envs: EnvSlot,
    delegates: usize,
}

impl SimpleState {
    fn new(env: Environment) -> Self {
        Self { envs: EnvSlot::new(env), delegates: 0 }
    }
}

impl VisitState for SimpleState {
    fn envs(&self) -> &EnvSlot {
        &self.envs
    }

    fn envs_mut(&mut self) -> &mut EnvSlot {
        &mut self.envs
    }
}

/// Visited-once bookkeeping shared by the simple analyses.
struct SimpleMemo {
    visited: HashSet<SourceRef>,
    visiting_delegates: Vec<HashSet<SourceRef>>,
}

impl SimpleMemo {
    fn new() -> Self {
        Self { visited: HashSet::new(), visiting_delegates: vec![HashSet::new()] }
    }

    fn enter(&mut self, source: &SourceRef, state: &mut SimpleState) {
        if source.scope() == Scope::SingleInstance {
            self.visiting_delegates.push(HashSet::new());
            state.delegates = self.visiting_delegates.len() - 1;
        }
        let env = state.env().enter(source);
        state.envs.set(env);
    }

    fn should_descend(&mut self, source: &SourceRef, state: &SimpleState) -> bool {
        if state.envs.at_container() && !self.visited.insert(source.clone()) {
            return false;
        }
        if matches!(&**source, InstanceSource::Delegate { .. }) {
            return self.visiting_delegates[state.delegates].insert(source.clone());
        }
        true
    }

    fn after(&mut self, source: &SourceRef, state: &SimpleState) {
        if matches!(&**source, InstanceSource::Delegate { .. }) {
            self.visiting_delegates[state.delegates].remove(source);
        }
    }
}

macro_rules! simple_visitor_plumbing {
    () => {
        type State = SimpleState;

        fn cancellation(&self) -> &CancellationToken {
            self.cancel
        }

        fn max_depth(&self) -> usize {
            self.max_depth
        }

        fn enter(&mut self, source: &SourceRef, state: &mut SimpleState) {
            self.memo.enter(source, state);
        }

        fn should_descend(&mut self, source: &SourceRef, state: &mut SimpleState) -> bool {
            self.memo.should_descend(source, state)
        }

        fn after(&mut self, source: &SourceRef, state: &SimpleState) -> PlanResult<()> {
            self.memo.after(source, state);
            Ok(())
        }
    };
}

// ----- Unsafe -----

struct UnsafeProbe<'a> {
    cancel: &'a CancellationToken,
    max_depth: usize,
    memo: SimpleMemo,
    found: bool,
}

impl Visitor for UnsafeProbe<'_> {
    simple_visitor_plumbing!();

    fn exited(&self) -> bool {
        self.found
    }

    fn before(&mut self, source: Option<&SourceRef>, _request: Request<'_>, _state: &SimpleState) -> PlanResult<bool> {
        let Some(source) = source else {
            return Ok(false);
        };
        if source.of_type().is_unsafe() {
            self.found = true;
            return Ok(false);
        }
        Ok(true)
    }
}

/// Whether resolving `root` touches a pointer or function-pointer type
/// anywhere in its dependency closure.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{requires_unsafe, CancellationToken, Method, Parameter, ProviderCollection, Scope, TypeKey};
///
/// let mut services = ProviderCollection::new();
/// services.add_per_dependency(Method::constructor(
///     TypeKey::named("Reader"),
///     [Parameter::required("buffer", TypeKey::pointer(TypeKey::named("byte")))],
/// ));
/// services.add_factory_method(
///     Method::function(TypeKey::named("Module"), "buffer", [], TypeKey::pointer(TypeKey::named("byte"))),
///     Scope::InstancePerDependency,
/// );
/// services.add_per_dependency(Method::constructor(TypeKey::named("Safe"), []));
/// let container = services.build();
///
/// let cancel = CancellationToken::new();
/// assert!(requires_unsafe(&TypeKey::named("Reader"), &container, &cancel).unwrap());
/// assert!(!requires_unsafe(&TypeKey::named("Safe"), &container, &cancel).unwrap());
/// ```
pub fn requires_unsafe(root: &TypeKey, env: &Environment, cancel: &CancellationToken) -> PlanResult<bool> {
    let container = env.root();
    let mut probe = UnsafeProbe { cancel, max_depth: DEFAULT_MAX_DEPTH, memo: SimpleMemo::new(), found: false };
    let state = SimpleState::new(container.clone());
    visit::visit(&mut probe, container.lookup(root), Request::of(root), &state, 0)?;
    Ok(probe.found)
}

// ----- Async -----

struct AsyncProbe<'a> {
    cancel: &'a CancellationToken,
    max_depth: usize,
    memo: SimpleMemo,
    found: bool,
}

impl Visitor for AsyncProbe<'_> {
    simple_visitor_plumbing!();

    fn exited(&self) -> bool {
        self.found
    }

    fn before(&mut self, source: Option<&SourceRef>, _request: Request<'_>, _state: &SimpleState) -> PlanResult<bool> {
        let Some(source) = source else {
            return Ok(false);
        };
        match &**source {
            // An async delegate only produces a task; creating it never suspends.
            InstanceSource::Delegate { is_async: true, .. } => Ok(false),
            _ if source.is_async() => {
                self.found = true;
                Ok(false)
            }
            _ => Ok(true),
        }
    }
}

/// Answers "does producing this source ever suspend?", memoised per session.
///
/// Sources are probed from the container environment, which is where single
/// instances (the main client of this check) are always resolved.
#[derive(Debug)]
pub struct RequiresAsyncChecker {
    container: Environment,
    cancel: CancellationToken,
    max_depth: usize,
    cache: HashMap<SourceRef, bool>,
}

impl RequiresAsyncChecker {
    pub fn new(env: &Environment, cancel: CancellationToken, max_depth: usize) -> Self {
        Self { container: env.root(), cancel, max_depth, cache: HashMap::new() }
    }

    pub fn requires_async(&mut self, source: &SourceRef) -> PlanResult<bool> {
        if let Some(&cached) = self.cache.get(source) {
            return Ok(cached);
        }
        let mut probe = AsyncProbe {
            cancel: &self.cancel,
            max_depth: self.max_depth,
            memo: SimpleMemo::new(),
            found: false,
        };
        let state = SimpleState::new(self.container.clone());
        visit::visit(
            &mut probe,
            Some(source.clone()),
            Request::of(source.of_type()),
            &state,
            0,
        )?;
        let found = probe.found;
        self.cache.insert(source.clone(), found);
        Ok(found)
    }
}

// ----- Early single instances -----

struct EarlySingletons<'a> {
    cancel: &'a CancellationToken,
    max_depth: usize,
    memo: SimpleMemo,
    checker: &'a mut RequiresAsyncChecker,
    found: Vec<SourceRef>,
}

impl Visitor for EarlySingletons<'_> {
    simple_visitor_plumbing!();

    fn before(&mut self, source: Option<&SourceRef>, _request: Request<'_>, _state: &SimpleState) -> PlanResult<bool> {
        let Some(source) = source else {
            return Ok(false);
        };
        if let InstanceSource::Delegate { is_async: true, .. } = &**source {
            return Ok(false);
        }
        if source.scope() == Scope::SingleInstance {
            if self.checker.requires_async(source)? && !self.found.contains(source) {
                self.found.push(source.clone());
            }
            return Ok(false);
        }
        Ok(true)
    }
}

/// Asynchronous single instances a synchronous delegate's body needs.
///
/// A synchronous delegate cannot await inside its body, so when it is created
/// in an asynchronous context these singletons are resolved (and awaited)
/// before the delegate and captured by it.
pub(crate) fn single_instances_to_create_early(
    checker: &mut RequiresAsyncChecker,
    delegate: &SourceRef,
    env: &Environment,
) -> PlanResult<Vec<SourceRef>> {
    let cancel = checker.cancel.clone();
    let max_depth = checker.max_depth;
    let mut visitor = EarlySingletons { cancel: &cancel, max_depth, memo: SimpleMemo::new(), checker, found: Vec::new() };
    let state = SimpleState::new(env.clone());
    visit::visit(
        &mut visitor,
        Some(delegate.clone()),
        Request::of(delegate.of_type()),
        &state,
        0,
    )?;
    Ok(visitor.found)
}
