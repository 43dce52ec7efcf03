//! Lowering: provider graph → ordered operation list.
//!
//! The lowerer walks the graph depth-first from a target source. Each visited
//! provider produces exactly one creation operation (plus initialization and
//! await operations where needed) after all its dependencies. Memoized sources
//! are reused instead of revisited, single instances become accessor calls,
//! and delegate and owned bodies are lowered recursively into nested plans.
//! In asynchronous contexts the result is reordered by a [`Scheduler`].
//!
//! # Examples
//!
//! ```rust
//! use ferrous_inject::{lower_resolution, CancellationToken, Method, Parameter, PlannerConfig,
//!     ProviderCollection, Statement, TypeKey};
//!
//! let mut services = ProviderCollection::new();
//! services
//!     .add_single_instance(Method::constructor(TypeKey::named("Config"), []))
//!     .add_per_resolution(Method::constructor(
//!         TypeKey::named("App"),
//!         [Parameter::required("config", TypeKey::named("Config"))],
//!     ));
//! let container = services.build();
//!
//! let root = container.lookup(&TypeKey::named("App")).unwrap();
//! let plan = lower_resolution(&root, &container, false, &PlannerConfig::default(), &CancellationToken::new())
//!     .unwrap();
//!
//! assert!(matches!(plan.operations[0].statement, Statement::SingleInstanceReference { .. }));
//! assert!(plan.is_topologically_ordered());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::debug;

use crate::analysis::{single_instances_to_create_early, RequiresAsyncChecker};
use crate::cancellation::CancellationToken;
use crate::config::PlannerConfig;
use crate::environment::Environment;
use crate::error::{PlanError, PlanResult};
use crate::key::TypeKey;
use crate::lifetime::Scope;
use crate::provider::{InstanceSource, SourceRef};
use crate::visit::{self, EnvSlot, Request, VisitState, Visitor};

mod disposal;
mod names;
mod operation;
mod schedule;

pub(crate) use disposal::{DisposalLowerer, DisposalStyle};
pub use names::AccessorNames;
pub use operation::{Declaration, Disposal, Operation, OperationRef, Plan, Statement};
pub use schedule::{EmissionOrder, LongestSuspensionChain, Scheduler};

use names::NameGenerator;

type Existing = HashMap<SourceRef, (OperationRef, String)>;

/// Lowers a root resolution.
///
/// `env` must be the container environment (or an environment derived from
/// it); `is_async` selects asynchronous resolution, which enables awaits and
/// rescheduling. The disposal style follows `is_async`.
pub fn lower_resolution(
    target: &SourceRef,
    env: &Environment,
    is_async: bool,
    config: &PlannerConfig,
    cancel: &CancellationToken,
) -> PlanResult<Plan> {
    let mut session = Session::new(env, config, cancel);
    let plan = session.lower(
        target,
        env,
        DisposalLowerer::new(DisposalStyle::container(is_async)),
        false,
        is_async,
        Existing::new(),
    )?;
    debug!(target = %target.of_type(), is_async, operations = plan.len(), "Lowered resolution");
    Ok(plan)
}

/// State shared by a root lowering and all plans nested inside it.
pub(crate) struct Session {
    container: Environment,
    cancel: CancellationToken,
    max_depth: usize,
    scheduler: &'static dyn Scheduler,
    requires_async: RequiresAsyncChecker,
    /// Delegates whose bodies are being lowered, with their variable names
    currently_lowering: HashMap<SourceRef, String>,
    names: NameGenerator,
    next_operation: usize,
}

impl Session {
    pub(crate) fn new(env: &Environment, config: &PlannerConfig, cancel: &CancellationToken) -> Self {
        Self {
            container: env.root(),
            cancel: cancel.clone(),
            max_depth: config.max_depth,
            scheduler: config.scheduler.scheduler(),
            requires_async: RequiresAsyncChecker::new(env, cancel.clone(), config.max_depth),
            currently_lowering: HashMap::new(),
            names: NameGenerator::default(),
            next_operation: 0,
        }
    }

    pub(crate) fn requires_async(&mut self, source: &SourceRef) -> PlanResult<bool> {
        self.requires_async.requires_async(source)
    }

    pub(crate) fn lower(
        &mut self,
        target: &SourceRef,
        env: &Environment,
        disposal: DisposalLowerer,
        is_single_instance_creation: bool,
        is_async_context: bool,
        existing: Existing,
    ) -> PlanResult<Plan> {
        let mut lowerer = Lowerer {
            session: self,
            target: target.clone(),
            disposal,
            is_single_instance_creation,
            is_async_context,
            existing,
            order: Vec::new(),
            frames: vec![Frame::default()],
        };
        let state = LowerState {
            envs: EnvSlot::new(env.clone()),
            name: String::new(),
            frame: 0,
            parent_frame: 0,
        };
        visit::visit(&mut lowerer, Some(target.clone()), Request::of(target.of_type()), &state, 0)?;

        let Some(Some(target_name)) = lowerer.frames[0].dependencies.first().cloned() else {
            return Err(PlanError::Unsupported(format!("lowering '{}' produced no value", target.of_type())));
        };
        let order = lowerer.order;
        let operations = if is_async_context {
            self.scheduler.schedule(order)?
        } else {
            order
        };
        Ok(Plan { operations, target: target_name })
    }
}

/// Values and operations accumulated for the provider under construction.
#[derive(Debug, Default)]
struct Frame {
    dependencies: SmallVec<[Option<String>; 4]>,
    operations: SmallVec<[OperationRef; 4]>,
}

#[derive(Clone)]
struct LowerState {
    envs: EnvSlot,
    /// Variable of the provider being lowered
    name: String,
    frame: usize,
    parent_frame: usize,
}

impl VisitState for LowerState {
    fn envs(&self) -> &EnvSlot {
        &self.envs
    }

    fn envs_mut(&mut self) -> &mut EnvSlot {
        &mut self.envs
    }
}

struct Lowerer<'s> {
    session: &'s mut Session,
    target: SourceRef,
    disposal: DisposalLowerer,
    is_single_instance_creation: bool,
    is_async_context: bool,
    existing: Existing,
    order: Vec<OperationRef>,
    frames: Vec<Frame>,
}

impl Lowerer<'_> {
    fn name_for(&mut self, source: &InstanceSource, state: &LowerState) -> String {
        self.session.names.variable(source.of_type(), state.env().depth())
    }

    fn operation(&mut self, statement: Statement, variable_to_dispose: &str, dependencies: Vec<OperationRef>) -> OperationRef {
        let disposal = self.disposal.create_disposal(&statement, variable_to_dispose);
        self.operation_with(statement, disposal, dependencies)
    }

    fn operation_with(
        &mut self,
        statement: Statement,
        disposal: Option<Disposal>,
        dependencies: Vec<OperationRef>,
    ) -> OperationRef {
        let can_dispose_locally = disposal
            .as_ref()
            .map_or(false, |d| !d.is_async() || self.is_async_context);
        let id = self.session.next_operation;
        self.session.next_operation += 1;
        Arc::new(Operation { id, statement, disposal, dependencies, can_dispose_locally })
    }

    fn emit(&mut self, operation: &OperationRef) {
        self.order.push(operation.clone());
    }

    fn push_dependency(&mut self, frame: usize, name: Option<String>, operation: Option<OperationRef>) {
        let frame = &mut self.frames[frame];
        frame.dependencies.push(name);
        frame.operations.extend(operation);
    }

    /// Single instances already available to a nested plan.
    fn singletons_in_scope(&self) -> Existing {
        self.existing
            .iter()
            .filter(|(source, _)| source.scope() == Scope::SingleInstance)
            .map(|(source, value)| (source.clone(), value.clone()))
            .collect()
    }

    fn nested_target(&self, state: &LowerState, ty: &TypeKey) -> PlanResult<SourceRef> {
        state
            .env()
            .lookup(ty)
            .ok_or_else(|| PlanError::Unsupported(format!("no source for '{}' reached lowering", ty)))
    }

    fn reference_single_instance(&mut self, source: &SourceRef, state: &LowerState) -> PlanResult<()> {
        let mut name = self.name_for(source, state);
        let is_async = self.session.requires_async(source)?;
        let statement = Statement::SingleInstanceReference { variable: name.clone(), source: source.clone(), is_async };
        let target_operation = if is_async {
            let awaited = self.name_for(source, state);
            let reference = self.operation(statement, &state.name, Vec::new());
            self.emit(&reference);
            let awaiting = self.operation(
                Statement::Await { variable: Some(awaited.clone()), task: name, ty: Some(source.of_type().clone()) },
                &state.name,
                vec![reference],
            );
            self.emit(&awaiting);
            name = awaited;
            awaiting
        } else {
            let reference = self.operation(statement, &state.name, Vec::new());
            self.emit(&reference);
            reference
        };
        self.existing.insert(source.clone(), (target_operation.clone(), name.clone()));
        self.push_dependency(state.frame, Some(name), Some(target_operation));
        Ok(())
    }

    fn lower_delegate(&mut self, source: &SourceRef, return_type: &TypeKey, is_async: bool, state: &LowerState) -> PlanResult<OperationRef> {
        self.session.currently_lowering.insert(source.clone(), state.name.clone());
        let body_target = self.nested_target(state, return_type)?;
        let singletons = self.singletons_in_scope();
        let plan = self.session.lower(&body_target, state.env(), self.disposal, false, is_async, singletons)?;
        self.session.currently_lowering.remove(source);

        let dispose_actions = format!("{}_disposeActions", state.name);
        let statement = Statement::DelegateCreation {
            variable: state.name.clone(),
            source: source.clone(),
            plan,
            dispose_actions: dispose_actions.clone(),
        };
        let disposal = self.disposal.create_disposal(&statement, &state.name);
        let mut dependencies = self.frames[state.frame].operations.to_vec();
        if let Some(Disposal::Delegate { is_async, .. }) = &disposal {
            let registry = self.operation(
                Statement::DisposeActionsCreation { variable: dispose_actions, is_async: *is_async },
                &state.name,
                Vec::new(),
            );
            self.emit(&registry);
            dependencies.push(registry);
        }
        let operation = self.operation_with(statement, disposal, dependencies);
        self.emit(&operation);
        Ok(operation)
    }

    fn lower_owned(&mut self, source: &SourceRef, value_type: &TypeKey, is_async: bool, state: &LowerState) -> PlanResult<OperationRef> {
        let cached = self.existing.get(source).cloned();
        let (function_operation, function) = match cached {
            Some(cached) => cached,
            None => {
                let body_target = self.nested_target(state, value_type)?;
                let singletons = self.singletons_in_scope();
                let plan = self.session.lower(
                    &body_target,
                    state.env(),
                    self.disposal.with_style(DisposalStyle::owned(is_async)),
                    false,
                    is_async,
                    singletons,
                )?;
                let function = self.session.names.owned_function(source.of_type());
                let operation = self.operation_with(
                    Statement::OwnedCreationFunction {
                        function: function.clone(),
                        source: source.clone(),
                        is_async_context: self.is_async_context,
                        plan,
                    },
                    None,
                    Vec::new(),
                );
                self.emit(&operation);
                self.existing.insert(source.clone(), (operation.clone(), function.clone()));
                (operation, function)
            }
        };

        let mut dependencies = self.frames[state.frame].operations.to_vec();
        dependencies.push(function_operation);
        let operation = self.operation(
            Statement::OwnedCreation {
                variable: state.name.clone(),
                source: source.clone(),
                is_async_context: self.is_async_context,
                function,
            },
            &state.name,
            dependencies,
        );
        self.emit(&operation);
        Ok(operation)
    }

    fn lower_creation(&mut self, source: &SourceRef, state: &LowerState) -> OperationRef {
        let arguments = self.frames[state.frame].dependencies.to_vec();
        let dependencies = self.frames[state.frame].operations.to_vec();
        let name = state.name.clone();

        if source.requires_initialization() {
            let creation = self.operation(
                Statement::DependencyCreation { variable: name.clone(), source: source.clone(), arguments },
                &name,
                dependencies,
            );
            self.emit(&creation);
            if source.is_async() {
                let task = self.name_for(source, state);
                let initialization = self.operation(
                    Statement::Initialization { task_variable: Some(task.clone()), variable: name.clone(), is_async: true },
                    &name,
                    vec![creation],
                );
                self.emit(&initialization);
                let awaiting =
                    self.operation(Statement::Await { variable: None, task, ty: None }, &name, vec![initialization]);
                self.emit(&awaiting);
                awaiting
            } else {
                let initialization = self.operation(
                    Statement::Initialization { task_variable: None, variable: name.clone(), is_async: false },
                    &name,
                    vec![creation],
                );
                self.emit(&initialization);
                initialization
            }
        } else if source.is_async() {
            let task = self.name_for(source, state);
            let creation = self.operation(
                Statement::DependencyCreation { variable: task.clone(), source: source.clone(), arguments },
                &name,
                dependencies,
            );
            self.emit(&creation);
            let awaiting = self.operation(
                Statement::Await { variable: Some(name.clone()), task, ty: Some(source.of_type().clone()) },
                &name,
                vec![creation],
            );
            self.emit(&awaiting);
            awaiting
        } else {
            let creation = self.operation(
                Statement::DependencyCreation { variable: name.clone(), source: source.clone(), arguments },
                &name,
                dependencies,
            );
            self.emit(&creation);
            creation
        }
    }
}

impl Visitor for Lowerer<'_> {
    type State = LowerState;

    fn cancellation(&self) -> &CancellationToken {
        &self.session.cancel
    }

    fn max_depth(&self) -> usize {
        self.session.max_depth
    }

    fn before(&mut self, source: Option<&SourceRef>, request: Request<'_>, state: &LowerState) -> PlanResult<bool> {
        let Some(source) = source else {
            if !request.is_optional() {
                return Err(PlanError::Unsupported(format!("no source for required '{}'", request.ty)));
            }
            // Omitted optional parameter.
            self.push_dependency(state.frame, None, None);
            return Ok(false);
        };

        if source.scope() != Scope::InstancePerDependency {
            if let Some((operation, name)) = self.existing.get(source) {
                let (operation, name) = (operation.clone(), name.clone());
                self.push_dependency(state.frame, Some(name), Some(operation));
                return Ok(false);
            }
        }

        if matches!(&**source, InstanceSource::Delegate { .. }) {
            if let Some(name) = self.session.currently_lowering.get(source) {
                let name = name.clone();
                self.push_dependency(state.frame, Some(name), None);
                return Ok(false);
            }
        }

        if source.scope() == Scope::SingleInstance
            && !matches!(&**source, InstanceSource::Instance { .. } | InstanceSource::Forwarded { .. })
            && !(self.is_single_instance_creation && Arc::ptr_eq(source, &self.target))
        {
            self.reference_single_instance(source, state)?;
            return Ok(false);
        }

        if let InstanceSource::DelegateParameter { name, .. } = &**source {
            self.push_dependency(state.frame, Some(name.to_string()), None);
            return Ok(false);
        }

        Ok(true)
    }

    fn enter(&mut self, source: &SourceRef, state: &mut LowerState) {
        let name = self.name_for(source, state);
        self.frames[state.frame].dependencies.push(Some(name.clone()));
        self.frames.push(Frame::default());
        state.parent_frame = state.frame;
        state.frame = self.frames.len() - 1;
        state.name = name;
        let env = state.env().enter(source);
        state.envs.set(env);
    }

    fn should_descend(&mut self, _source: &SourceRef, _state: &mut LowerState) -> bool {
        true
    }

    fn visit_children(&mut self, source: &SourceRef, state: &LowerState, depth: usize) -> PlanResult<()> {
        match &**source {
            InstanceSource::Delegate { is_async, .. } => {
                if self.is_async_context && !*is_async {
                    // Resolve the async singletons the synchronous body needs
                    // out here, where awaiting is possible.
                    let outer = state.envs.previous().cloned().unwrap_or_else(|| self.session.container.clone());
                    let mut outer_state = state.clone();
                    outer_state.envs.set(outer.clone());
                    let early = single_instances_to_create_early(&mut self.session.requires_async, source, &outer)?;
                    for singleton in early {
                        visit::visit(self, Some(singleton.clone()), Request::of(singleton.of_type()), &outer_state, depth + 1)?;
                    }
                }
                Ok(())
            }
            // Lowered as a whole in `after`.
            InstanceSource::Owned { .. } => Ok(()),
            _ => visit::walk_children(self, source, state, depth),
        }
    }

    fn after(&mut self, source: &SourceRef, state: &LowerState) -> PlanResult<()> {
        let target_operation = match &**source {
            InstanceSource::Delegate { return_type, is_async, .. } => {
                self.lower_delegate(source, return_type, *is_async, state)?
            }
            InstanceSource::Owned { value_type, is_async, .. } => self.lower_owned(source, value_type, *is_async, state)?,
            _ => self.lower_creation(source, state),
        };

        if source.scope() != Scope::InstancePerDependency {
            self.existing.insert(source.clone(), (target_operation.clone(), state.name.clone()));
        }
        self.frames[state.parent_frame].operations.push(target_operation);
        Ok(())
    }
}
