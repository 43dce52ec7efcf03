//! Whole-container planning.
//!
//! A container exposes a set of root resolutions. [`ContainerPlanner`] checks
//! and lowers each root, discovers every single instance the resulting plans
//! reference (directly or inside delegate and owned bodies), lowers one
//! accessor per singleton and orders the singletons so that each is created
//! after the singletons it depends on. Disposal runs in the reverse order.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::analysis::{requires_unsafe, RequiresAsyncChecker};
use crate::cancellation::CancellationToken;
use crate::checker::DependencyChecker;
use crate::config::PlannerConfig;
use crate::diagnostics::{Diagnostic, Location};
use crate::environment::Environment;
use crate::error::{PlanError, PlanResult};
use crate::key::TypeKey;
use crate::lowering::{lower_resolution, AccessorNames, DisposalLowerer, DisposalStyle, Plan, Session, Statement};
use crate::provider::SourceRef;

/// A type the container resolves, synchronously or asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRequest {
    pub ty: TypeKey,
    pub is_async: bool,
}

impl RootRequest {
    pub fn sync(ty: TypeKey) -> Self {
        Self { ty, is_async: false }
    }

    pub fn asynchronous(ty: TypeKey) -> Self {
        Self { ty, is_async: true }
    }
}

/// Outcome of one root.
#[derive(Debug, Clone)]
pub enum RootResolution {
    Plan(Plan),
    /// The root failed checking; the renderer emits a body that throws.
    Stub { diagnostics: Vec<Diagnostic> },
}

#[derive(Debug, Clone)]
pub struct RootPlan {
    pub request: RootRequest,
    pub resolution: RootResolution,
}

impl RootPlan {
    pub fn plan(&self) -> Option<&Plan> {
        match &self.resolution {
            RootResolution::Plan(plan) => Some(plan),
            RootResolution::Stub { .. } => None,
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self.resolution, RootResolution::Stub { .. })
    }
}

/// Lazily-created single instance and the plan that constructs it.
#[derive(Debug, Clone)]
pub struct SingletonAccessor {
    pub source: SourceRef,
    pub names: AccessorNames,
    pub plan: Plan,
    /// Whether constructing the value suspends
    pub is_async: bool,
    /// Indices (into [`ContainerPlan::singletons`]) of the singletons this
    /// one references
    pub dependencies: BTreeSet<usize>,
}

#[derive(Debug, Clone)]
pub struct ContainerPlan {
    pub roots: Vec<RootPlan>,
    /// In discovery order
    pub singletons: Vec<SingletonAccessor>,
    /// Indices into `singletons`, dependencies first
    pub creation_order: Vec<usize>,
    /// Whether any root touches pointer types
    pub requires_unsafe: bool,
    /// Whether the container is disposed asynchronously
    pub is_async_disposal: bool,
}

impl ContainerPlan {
    pub fn stubbed_roots(&self) -> impl Iterator<Item = &RootPlan> + '_ {
        self.roots.iter().filter(|root| root.is_stub())
    }

    /// Singletons in creation order.
    pub fn creation_order(&self) -> impl Iterator<Item = &SingletonAccessor> + '_ {
        self.creation_order.iter().map(move |&i| &self.singletons[i])
    }

    /// Singletons in exact reverse creation order.
    pub fn disposal_order(&self) -> impl Iterator<Item = &SingletonAccessor> + '_ {
        self.creation_order.iter().rev().map(move |&i| &self.singletons[i])
    }

    pub fn singleton(&self, ty: &TypeKey) -> Option<&SingletonAccessor> {
        self.singletons.iter().find(|accessor| accessor.source.of_type() == ty)
    }
}

/// Plans every root of a container.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{ContainerPlanner, Disposability, Method, Parameter, ProviderCollection,
///     ProviderOptions, RootRequest, Scope, TypeKey};
///
/// let mut services = ProviderCollection::new();
/// services
///     .add_registration_with(
///         Method::constructor(TypeKey::named("Pool"), []),
///         Scope::SingleInstance,
///         ProviderOptions::new().disposable(Disposability::Sync),
///     )
///     .add_registration_with(
///         Method::constructor(TypeKey::named("Cache"), [Parameter::required("pool", TypeKey::named("Pool"))]),
///         Scope::SingleInstance,
///         ProviderOptions::new().disposable(Disposability::Sync),
///     )
///     .add_per_resolution(Method::constructor(
///         TypeKey::named("Handler"),
///         [Parameter::required("cache", TypeKey::named("Cache"))],
///     ));
/// let container = services.build();
///
/// let plan = ContainerPlanner::new(&container)
///     .plan(&[RootRequest::sync(TypeKey::named("Handler"))])
///     .unwrap();
///
/// let disposed: Vec<String> = plan.disposal_order().map(|s| s.source.of_type().to_string()).collect();
/// assert_eq!(disposed, ["Cache", "Pool"]);
/// ```
#[derive(Debug)]
pub struct ContainerPlanner {
    env: Environment,
    config: PlannerConfig,
    cancel: CancellationToken,
    location: Option<Location>,
}

impl ContainerPlanner {
    pub fn new(env: &Environment) -> Self {
        Self {
            env: env.root(),
            config: PlannerConfig::default(),
            cancel: CancellationToken::new(),
            location: None,
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn plan(&self, roots: &[RootRequest]) -> PlanResult<ContainerPlan> {
        let is_async_disposal = roots.iter().any(|root| root.is_async);
        let mut checker = DependencyChecker::new(&self.env)
            .with_cancellation(self.cancel.clone())
            .with_config(&self.config);
        if let Some(location) = &self.location {
            checker = checker.with_location(location.clone());
        }

        let mut planned = Vec::with_capacity(roots.len());
        let mut unsafe_needed = false;
        for request in roots {
            let mut diagnostics: Vec<Diagnostic> = Vec::new();
            let resolution = if checker.check(&request.ty, request.is_async, &mut diagnostics)? {
                warn!(root = %request.ty, errors = diagnostics.len(), "Root has dependency errors, emitting stub");
                RootResolution::Stub { diagnostics }
            } else {
                let target = self.env.lookup(&request.ty).ok_or_else(|| {
                    PlanError::Unsupported(format!("checked root '{}' has no source", request.ty))
                })?;
                unsafe_needed |= requires_unsafe(&request.ty, &self.env, &self.cancel)?;
                RootResolution::Plan(lower_resolution(&target, &self.env, request.is_async, &self.config, &self.cancel)?)
            };
            planned.push(RootPlan { request: request.clone(), resolution });
        }

        let singletons = self.plan_singletons(&planned, is_async_disposal)?;
        let creation_order = creation_order(&singletons);
        debug!(
            roots = planned.len(),
            singletons = singletons.len(),
            is_async_disposal,
            "Planned container"
        );

        Ok(ContainerPlan {
            roots: planned,
            singletons,
            creation_order,
            requires_unsafe: unsafe_needed,
            is_async_disposal,
        })
    }

    fn plan_singletons(&self, roots: &[RootPlan], is_async_disposal: bool) -> PlanResult<Vec<SingletonAccessor>> {
        let mut discovered: Vec<SourceRef> = Vec::new();
        let mut index: HashMap<SourceRef, usize> = HashMap::new();
        let mut discover = |source: SourceRef, discovered: &mut Vec<SourceRef>| -> usize {
            *index.entry(source.clone()).or_insert_with(|| {
                discovered.push(source);
                discovered.len() - 1
            })
        };

        for plan in roots.iter().filter_map(RootPlan::plan) {
            let mut referenced = Vec::new();
            referenced_singletons(plan, &mut referenced);
            for source in referenced {
                discover(source, &mut discovered);
            }
        }

        let mut async_checker = RequiresAsyncChecker::new(&self.env, self.cancel.clone(), self.config.max_depth);
        let disposal = DisposalLowerer::new(DisposalStyle::container(is_async_disposal));
        let mut accessors = Vec::new();
        // Lowering an accessor may discover further singletons.
        let mut next = 0;
        while next < discovered.len() {
            self.cancel.throw_if_cancelled()?;
            let source = discovered[next].clone();
            let is_async = async_checker.requires_async(&source)?;
            let mut session = Session::new(&self.env, &self.config, &self.cancel);
            let plan = session.lower(&source, &self.env, disposal, true, is_async, HashMap::new())?;

            let mut referenced = Vec::new();
            referenced_singletons(&plan, &mut referenced);
            let dependencies = referenced
                .into_iter()
                .map(|dep| discover(dep, &mut discovered))
                .filter(|&dep| dep != next)
                .collect();

            debug!(singleton = %source.of_type(), is_async, operations = plan.len(), "Lowered singleton accessor");
            accessors.push(SingletonAccessor {
                names: AccessorNames::new(source.of_type(), next),
                source,
                plan,
                is_async,
                dependencies,
            });
            next += 1;
        }
        Ok(accessors)
    }
}

/// Singletons a plan references, including inside nested plans, in first-use order.
fn referenced_singletons(plan: &Plan, out: &mut Vec<SourceRef>) {
    for op in &plan.operations {
        match &op.statement {
            Statement::SingleInstanceReference { source, .. } => {
                if !out.contains(source) {
                    out.push(source.clone());
                }
            }
            Statement::DelegateCreation { plan, .. } | Statement::OwnedCreationFunction { plan, .. } => {
                referenced_singletons(plan, out)
            }
            _ => {}
        }
    }
}

/// Kahn's algorithm, always taking the lowest ready index.
///
/// Singletons can only depend on each other cyclically through a delegate,
/// which defers construction; such cycles are broken at the lowest index.
fn creation_order(singletons: &[SingletonAccessor]) -> Vec<usize> {
    let mut remaining: BTreeSet<usize> = (0..singletons.len()).collect();
    let mut order = Vec::with_capacity(singletons.len());
    while !remaining.is_empty() {
        let ready = remaining
            .iter()
            .copied()
            .find(|&i| singletons[i].dependencies.iter().all(|dep| !remaining.contains(dep)));
        let Some(next) = ready.or_else(|| remaining.iter().next().copied()) else {
            break;
        };
        remaining.remove(&next);
        order.push(next);
    }
    order
}
