//! # ferrous-inject
//!
//! Compile-time dependency injection planning. A declarative set of providers
//! (constructors, factory methods, pre-built values, decorators, collections)
//! annotated with lifetime scopes is turned, per requested root type, into a
//! fully ordered construction plan that a code emitter renders verbatim.
//!
//! ## Features
//!
//! - **Scope-aware lookup**: single instances, per-resolution and
//!   per-dependency providers, with delegate and owned scopes layered on top
//! - **Decorators**: applied in declaration order, including open generic
//!   decorators specialized by structural unification
//! - **Dependency checking**: circular, missing, ambiguous and
//!   async-only dependencies reported as diagnostics
//! - **Lowering**: memoized reuse, singleton accessors, nested delegate and
//!   owned bodies, initialization hooks, async suspension scheduling and
//!   mirrored disposal
//! - **Container planning**: singleton accessors in dependency order,
//!   disposed in exact reverse
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_inject::{lower_resolution, CancellationToken, DependencyChecker, Method, Parameter,
//!     PlannerConfig, ProviderCollection, TypeKey};
//!
//! let mut services = ProviderCollection::new();
//! services
//!     .add_single_instance(Method::constructor(TypeKey::named("Database"), []))
//!     .add_per_resolution(Method::constructor(
//!         TypeKey::named("UserService"),
//!         [Parameter::required("db", TypeKey::named("Database"))],
//!     ));
//! let container = services.build();
//!
//! let root = TypeKey::named("UserService");
//! let mut diagnostics: Vec<ferrous_inject::Diagnostic> = Vec::new();
//! let has_errors = DependencyChecker::new(&container).check(&root, false, &mut diagnostics).unwrap();
//! assert!(!has_errors);
//!
//! let source = container.lookup(&root).unwrap();
//! let plan = lower_resolution(&source, &container, false, &PlannerConfig::default(), &CancellationToken::new())
//!     .unwrap();
//! assert_eq!(plan.to_string(), "database_0_1 = single_instance<Database>()\n\
//!                               userservice_0_0 = UserService::new(database_0_1)\n\
//!                               return userservice_0_0");
//! ```
//!
//! ## Diagnostics
//!
//! ```rust
//! use ferrous_inject::{DependencyChecker, DiagnosticKind, Method, Parameter, ProviderCollection, TypeKey};
//!
//! let mut services = ProviderCollection::new();
//! services.add_per_resolution(Method::constructor(
//!     TypeKey::named("Mailer"),
//!     [Parameter::required("transport", TypeKey::named("Transport"))],
//! ));
//! let container = services.build();
//!
//! let mut diagnostics: Vec<ferrous_inject::Diagnostic> = Vec::new();
//! DependencyChecker::new(&container)
//!     .check(&TypeKey::named("Mailer"), false, &mut diagnostics)
//!     .unwrap();
//! assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingDependency);
//! assert_eq!(diagnostics[0].code(), "DI0102");
//! ```

pub mod analysis;
pub mod cancellation;
pub mod checker;
pub mod collection;
pub mod config;
pub mod container;
pub mod decoration;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod lowering;
pub mod provider;
pub mod runtime;
pub mod traits;

mod visit;

pub use analysis::{requires_unsafe, RequiresAsyncChecker};
pub use cancellation::CancellationToken;
pub use checker::DependencyChecker;
pub use collection::{ProviderCollection, ProviderOptions};
pub use config::{PlannerConfig, SchedulerKind, DEFAULT_MAX_DEPTH};
pub use container::{ContainerPlan, ContainerPlanner, RootPlan, RootRequest, RootResolution, SingletonAccessor};
pub use decoration::{DecoratorQuery, DecoratorResolver, DecoratorSource};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, FnSink, Location, TracingSink};
pub use environment::{Environment, Resolution};
pub use error::{ConfigError, ObjectDisposedError, PlanError, PlanResult};
pub use key::{Bindings, TypeKey};
pub use lifetime::Scope;
pub use lowering::{
    lower_resolution, AccessorNames, Declaration, Disposal, EmissionOrder, LongestSuspensionChain, Operation,
    OperationRef, Plan, Scheduler, Statement,
};
pub use provider::{Disposability, InstanceSource, Member, Method, MethodKind, Parameter, SourceRef};
pub use traits::{
    AsyncDispose, AsyncFactory, Dispose, Factory, RequiresAsyncInitialization, RequiresInitialization,
};
