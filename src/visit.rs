//! The single depth-first traversal shared by every analysis.
//!
//! Analyses implement [`Visitor`]; [`visit`] drives them. For each reachable
//! source the driver checks cancellation and depth, asks `before` whether to
//! go on, clones the state and lets `enter` update it, asks `should_descend`,
//! then visits the children and finally calls `after`.

use crate::cancellation::CancellationToken;
use crate::environment::Environment;
use crate::error::{PlanError, PlanResult};
use crate::key::TypeKey;
use crate::provider::{InstanceSource, Parameter, SourceRef};

/// Current and previous environment of a traversal state.
#[derive(Clone, Debug)]
pub(crate) struct EnvSlot {
    current: Environment,
    previous: Option<Environment>,
}

impl EnvSlot {
    pub(crate) fn new(env: Environment) -> Self {
        Self { current: env, previous: None }
    }

    pub(crate) fn current(&self) -> &Environment {
        &self.current
    }

    pub(crate) fn previous(&self) -> Option<&Environment> {
        self.previous.as_ref()
    }

    pub(crate) fn set(&mut self, env: Environment) {
        self.previous = Some(std::mem::replace(&mut self.current, env));
    }

    /// Whether the traversal is at, or has just left, the container frame.
    pub(crate) fn at_container(&self) -> bool {
        self.current.is_container() || self.previous.as_ref().map_or(false, Environment::is_container)
    }
}

pub(crate) trait VisitState: Clone {
    fn envs(&self) -> &EnvSlot;
    fn envs_mut(&mut self) -> &mut EnvSlot;

    fn env(&self) -> &Environment {
        self.envs().current()
    }
}

/// Why a source is being visited.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Request<'a> {
    pub(crate) ty: &'a TypeKey,
    pub(crate) parameter: Option<&'a Parameter>,
}

impl<'a> Request<'a> {
    pub(crate) fn of(ty: &'a TypeKey) -> Self {
        Self { ty, parameter: None }
    }

    pub(crate) fn parameter(parameter: &'a Parameter) -> Self {
        Self { ty: &parameter.ty, parameter: Some(parameter) }
    }

    pub(crate) fn is_optional(&self) -> bool {
        self.parameter.map_or(false, |p| p.optional)
    }
}

pub(crate) trait Visitor {
    type State: VisitState;

    fn cancellation(&self) -> &CancellationToken;

    fn max_depth(&self) -> usize;

    /// Stops the whole walk once true.
    fn exited(&self) -> bool {
        false
    }

    /// Called for every request, including unresolved ones (`source == None`).
    fn before(
        &mut self,
        source: Option<&SourceRef>,
        request: Request<'_>,
        state: &Self::State,
    ) -> PlanResult<bool>;

    fn enter(&mut self, source: &SourceRef, state: &mut Self::State) {
        let env = state.env().enter(source);
        state.envs_mut().set(env);
    }

    fn should_descend(&mut self, source: &SourceRef, state: &mut Self::State) -> bool;

    fn visit_children(&mut self, source: &SourceRef, state: &Self::State, depth: usize) -> PlanResult<()> {
        walk_children(self, source, state, depth)
    }

    fn after(&mut self, _source: &SourceRef, _state: &Self::State) -> PlanResult<()> {
        Ok(())
    }
}

/// Visits one (possibly unresolved) source.
pub(crate) fn visit<V: Visitor + ?Sized>(
    visitor: &mut V,
    source: Option<SourceRef>,
    request: Request<'_>,
    state: &V::State,
    depth: usize,
) -> PlanResult<()> {
    visitor.cancellation().throw_if_cancelled()?;
    if depth > visitor.max_depth() {
        return Err(PlanError::DepthExceeded(visitor.max_depth()));
    }
    if visitor.exited() || !visitor.before(source.as_ref(), request, state)? {
        return Ok(());
    }
    let Some(source) = source else {
        return Ok(());
    };

    let mut state = state.clone();
    visitor.enter(&source, &mut state);
    if visitor.should_descend(&source, &mut state) {
        visitor.visit_children(&source, &state, depth)?;
        visitor.after(&source, &state)?;
    }
    Ok(())
}

/// Default child traversal, one arm per provider kind.
pub(crate) fn walk_children<V: Visitor + ?Sized>(
    visitor: &mut V,
    source: &SourceRef,
    state: &V::State,
    depth: usize,
) -> PlanResult<()> {
    let depth = depth + 1;
    match &**source {
        InstanceSource::Registration { constructor, .. } => {
            visit_parameters(visitor, &constructor.parameters, None, state, depth)
        }
        InstanceSource::FactoryMethod { method, .. } => {
            visit_parameters(visitor, &method.parameters, None, state, depth)
        }
        InstanceSource::Decorated { decorator, underlying } => visit_parameters(
            visitor,
            decorator.parameters(),
            Some((decorator.decorated_parameter(), underlying)),
            state,
            depth,
        ),
        InstanceSource::Factory { underlying, .. } | InstanceSource::Forwarded { underlying, .. } => visit(
            visitor,
            Some(underlying.clone()),
            Request::of(underlying.of_type()),
            state,
            depth,
        ),
        InstanceSource::Delegate { return_type, .. } => {
            let target = state.env().lookup(return_type);
            visit(visitor, target, Request::of(return_type), state, depth)
        }
        InstanceSource::Owned { value_type, .. } => {
            let target = state.env().lookup(value_type);
            visit(visitor, target, Request::of(value_type), state, depth)
        }
        InstanceSource::Array { items, .. } => {
            for item in items {
                if visitor.exited() {
                    break;
                }
                visit(visitor, Some(item.clone()), Request::of(item.of_type()), state, depth)?;
            }
            Ok(())
        }
        InstanceSource::DelegateParameter { .. } | InstanceSource::Instance { .. } => Ok(()),
    }
}

/// Visits parameters in declaration order, binding the decorated parameter
/// (if any) to the underlying source instead of resolving it.
fn visit_parameters<V: Visitor + ?Sized>(
    visitor: &mut V,
    parameters: &[Parameter],
    decorated: Option<(usize, &SourceRef)>,
    state: &V::State,
    depth: usize,
) -> PlanResult<()> {
    for parameter in parameters {
        if visitor.exited() {
            break;
        }
        let source = match decorated {
            Some((ordinal, underlying)) if parameter.ordinal == ordinal => Some(underlying.clone()),
            _ => state.env().parameter_source(parameter),
        };
        visit(visitor, source, Request::parameter(parameter), state, depth)?;
    }
    Ok(())
}
