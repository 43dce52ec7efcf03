//! Dependency checking: cycles, missing, ambiguous and async-only providers.
//!
//! Validity is root-relative. The checker walks only the subgraph reachable
//! from the requested root, so a broken provider nothing asks for never
//! produces a diagnostic.

use std::collections::HashSet;

use tracing::debug;

use crate::cancellation::CancellationToken;
use crate::config::{PlannerConfig, DEFAULT_MAX_DEPTH};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Location};
use crate::environment::{Environment, Resolution};
use crate::error::PlanResult;
use crate::key::TypeKey;
use crate::lifetime::Scope;
use crate::provider::{InstanceSource, SourceRef};
use crate::visit::{self, EnvSlot, Request, VisitState, Visitor};

/// Validates roots against a container environment.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{DependencyChecker, DiagnosticKind, Method, Parameter, ProviderCollection, TypeKey};
///
/// let mut services = ProviderCollection::new();
/// services.add_per_dependency(Method::constructor(
///     TypeKey::named("A"),
///     [Parameter::required("b", TypeKey::named("B"))],
/// ));
/// let container = services.build();
///
/// let mut diagnostics: Vec<ferrous_inject::Diagnostic> = Vec::new();
/// let has_errors = DependencyChecker::new(&container)
///     .check(&TypeKey::named("A"), false, &mut diagnostics)
///     .unwrap();
///
/// assert!(has_errors);
/// assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingDependency);
/// assert_eq!(diagnostics[0].offending, TypeKey::named("B"));
/// ```
#[derive(Debug, Clone)]
pub struct DependencyChecker {
    env: Environment,
    cancel: CancellationToken,
    max_depth: usize,
    location: Option<Location>,
}

impl DependencyChecker {
    pub fn new(env: &Environment) -> Self {
        Self {
            env: env.root(),
            cancel: CancellationToken::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            location: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_config(mut self, config: &PlannerConfig) -> Self {
        self.max_depth = config.max_depth;
        self
    }

    /// Location attached to every diagnostic.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Checks one root, reporting every problem found through `sink`.
    ///
    /// Returns whether any diagnostic was reported. Fails only on
    /// cancellation or when the depth bound is exceeded.
    pub fn check(&self, root: &TypeKey, is_async: bool, sink: &mut dyn DiagnosticSink) -> PlanResult<bool> {
        let mut visitor = CheckVisitor {
            root,
            location: self.location.as_ref(),
            sink,
            cancel: &self.cancel,
            max_depth: self.max_depth,
            errors: 0,
            path: Vec::new(),
            visited: HashSet::new(),
            unresolved: HashSet::new(),
            visiting_delegates: vec![HashSet::new()],
        };
        let state = CheckState {
            envs: EnvSlot::new(self.env.clone()),
            is_async_context: is_async,
            path_start: 0,
            delegates: 0,
        };
        let source = self.env.lookup(root);
        visit::visit(&mut visitor, source, Request::of(root), &state, 0)?;
        debug!(root = %root, is_async, errors = visitor.errors, "Checked root");
        Ok(visitor.errors > 0)
    }
}

#[derive(Clone)]
struct CheckState {
    envs: EnvSlot,
    is_async_context: bool,
    /// Start of the current path segment; delegate bodies start a new segment
    path_start: usize,
    /// Index of the active visiting-delegates set
    delegates: usize,
}

impl VisitState for CheckState {
    fn envs(&self) -> &EnvSlot {
        &self.envs
    }

    fn envs_mut(&mut self) -> &mut EnvSlot {
        &mut self.envs
    }
}

struct CheckVisitor<'a, 's> {
    root: &'a TypeKey,
    location: Option<&'a Location>,
    sink: &'s mut dyn DiagnosticSink,
    cancel: &'a CancellationToken,
    max_depth: usize,
    errors: usize,
    path: Vec<SourceRef>,
    visited: HashSet<(SourceRef, bool)>,
    /// Unresolved types already reported for this root
    unresolved: HashSet<TypeKey>,
    /// One set per single-instance subtree; singletons cannot see the
    /// delegates being visited around them
    visiting_delegates: Vec<HashSet<SourceRef>>,
}

impl CheckVisitor<'_, '_> {
    fn report(&mut self, kind: DiagnosticKind, offending: &TypeKey, candidates: usize) {
        self.errors += 1;
        let mut diagnostic = Diagnostic::new(kind, self.root.clone(), offending.clone())
            .with_location(self.location.cloned());
        diagnostic.candidates = candidates;
        self.sink.report(diagnostic);
    }
}

impl Visitor for CheckVisitor<'_, '_> {
    type State = CheckState;

    fn cancellation(&self) -> &CancellationToken {
        self.cancel
    }

    fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn before(&mut self, source: Option<&SourceRef>, request: Request<'_>, state: &CheckState) -> PlanResult<bool> {
        let Some(source) = source else {
            if !request.is_optional() && self.unresolved.insert(request.ty.clone()) {
                match state.env().resolve(request.ty) {
                    Resolution::Ambiguous(candidates) => {
                        self.report(DiagnosticKind::AmbiguousDependency, request.ty, candidates)
                    }
                    _ => self.report(DiagnosticKind::MissingDependency, request.ty, 0),
                }
            }
            return Ok(false);
        };

        if self.path[state.path_start..].contains(source) {
            self.report(DiagnosticKind::CircularDependency, source.of_type(), 0);
            return Ok(false);
        }

        if source.is_async()
            && !state.is_async_context
            && !matches!(&**source, InstanceSource::Delegate { .. })
        {
            self.report(DiagnosticKind::RequiresAsync, source.of_type(), 0);
            return Ok(false);
        }

        Ok(true)
    }

    fn enter(&mut self, source: &SourceRef, state: &mut CheckState) {
        let env = state.env().enter(source);
        state.envs.set(env);
        match &**source {
            InstanceSource::Delegate { is_async, .. } => {
                state.is_async_context = *is_async;
                // The delegate itself is pushed next; its body starts after it.
                state.path_start = self.path.len() + 1;
            }
            InstanceSource::Owned { is_async, .. } => state.is_async_context = *is_async,
            _ => {}
        }
        if source.scope() == Scope::SingleInstance {
            self.visiting_delegates.push(HashSet::new());
            state.delegates = self.visiting_delegates.len() - 1;
        }
    }

    fn should_descend(&mut self, source: &SourceRef, state: &mut CheckState) -> bool {
        if state.envs.at_container() && !self.visited.insert((source.clone(), state.is_async_context)) {
            return false;
        }
        if matches!(&**source, InstanceSource::Delegate { .. })
            && !self.visiting_delegates[state.delegates].insert(source.clone())
        {
            return false;
        }
        self.path.push(source.clone());
        true
    }

    fn after(&mut self, source: &SourceRef, state: &CheckState) -> PlanResult<()> {
        self.path.pop();
        if matches!(&**source, InstanceSource::Delegate { .. }) {
            self.visiting_delegates[state.delegates].remove(source);
        }
        Ok(())
    }
}
