//! Provider collection: the declaration builder for a container.
//!
//! This module contains [`ProviderCollection`], which gathers registrations,
//! factories, factory methods, instances and decorators and builds the
//! immutable container [`Environment`] the planner runs against.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::decoration::{DecoratorResolver, DecoratorSource};
use crate::environment::{Environment, Registry};
use crate::key::TypeKey;
use crate::lifetime::Scope;
use crate::provider::{Disposability, InstanceSource, Member, Method, SourceRef};

/// Per-declaration options shared by registrations, factories and factory methods.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Disposability, ProviderOptions, TypeKey};
///
/// let options = ProviderOptions::new()
///     .initialized()
///     .disposable(Disposability::Sync)
///     .forward_as(TypeKey::named("IService"));
///
/// assert!(options.requires_initialization);
/// assert!(!options.is_async);
/// assert_eq!(options.as_types.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOptions {
    /// Run the initialization hook after construction
    pub requires_initialization: bool,
    /// Construction (or initialization, for registrations) suspends
    pub is_async: bool,
    pub disposability: Disposability,
    /// Additional types the provider is exposed as
    pub as_types: Vec<TypeKey>,
}

impl ProviderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialized(mut self) -> Self {
        self.requires_initialization = true;
        self
    }

    /// Asynchronous construction; for registrations, asynchronous initialization.
    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn disposable(mut self, disposability: Disposability) -> Self {
        self.disposability = disposability;
        self
    }

    pub fn forward_as(mut self, ty: TypeKey) -> Self {
        self.as_types.push(ty);
        self
    }
}

/// Declarations of one container.
///
/// Declaration order is significant: it is the element order of synthesized
/// arrays and the nesting order of decorators (first declared is innermost).
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Method, Parameter, ProviderCollection, Scope, TypeKey};
///
/// let mut services = ProviderCollection::new();
/// services
///     .add_single_instance(Method::constructor(TypeKey::named("Database"), []))
///     .add_per_resolution(Method::constructor(
///         TypeKey::named("UserService"),
///         [Parameter::required("db", TypeKey::named("Database"))],
///     ));
///
/// let container = services.build();
/// let source = container.lookup(&TypeKey::named("Database")).unwrap();
/// assert_eq!(source.scope(), Scope::SingleInstance);
/// ```
#[derive(Debug, Default)]
pub struct ProviderCollection {
    declared: Vec<SourceRef>,
    open_generic: Vec<SourceRef>,
    decorators: Vec<DecoratorSource>,
}

impl ProviderCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.declared.len() + self.open_generic.len() + self.decorators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ----- Registrations -----

    pub fn add_single_instance(&mut self, constructor: Method) -> &mut Self {
        self.add_registration(constructor, Scope::SingleInstance)
    }

    pub fn add_per_resolution(&mut self, constructor: Method) -> &mut Self {
        self.add_registration(constructor, Scope::InstancePerResolution)
    }

    pub fn add_per_dependency(&mut self, constructor: Method) -> &mut Self {
        self.add_registration(constructor, Scope::InstancePerDependency)
    }

    /// Registers `constructor.owner`, constructed through `constructor`.
    pub fn add_registration(&mut self, constructor: Method, scope: Scope) -> &mut Self {
        self.add_registration_with(constructor, scope, ProviderOptions::default())
    }

    /// Registers `constructor.owner` with explicit options.
    ///
    /// An asynchronous registration always requires initialization: constructors
    /// cannot suspend, so the suspension happens in the initialization hook.
    pub fn add_registration_with(&mut self, constructor: Method, scope: Scope, options: ProviderOptions) -> &mut Self {
        let source = Arc::new(InstanceSource::Registration {
            ty: constructor.owner.clone(),
            scope,
            constructor,
            requires_initialization: options.requires_initialization || options.is_async,
            is_async: options.is_async,
            disposability: options.disposability,
        });
        self.declare(source, &options.as_types)
    }

    // ----- Factories -----

    /// Registers a factory object and the type it produces.
    ///
    /// The factory type itself is registered with `factory_scope`; values of
    /// `factory_of` are created by it with `scope` and handed back to its
    /// release call on disposal.
    pub fn add_factory(
        &mut self,
        factory_constructor: Method,
        factory_scope: Scope,
        factory_of: TypeKey,
        scope: Scope,
        options: ProviderOptions,
    ) -> &mut Self {
        let factory = Arc::new(InstanceSource::Registration {
            ty: factory_constructor.owner.clone(),
            scope: factory_scope,
            constructor: factory_constructor,
            requires_initialization: false,
            is_async: false,
            disposability: Disposability::None,
        });
        self.declared.push(factory.clone());
        let source = Arc::new(InstanceSource::Factory {
            factory_of,
            underlying: factory,
            scope,
            is_async: options.is_async,
        });
        self.declare(source, &options.as_types)
    }

    /// Registers a factory function producing its return type.
    pub fn add_factory_method(&mut self, method: Method, scope: Scope) -> &mut Self {
        self.add_factory_method_with(method, scope, ProviderOptions::default())
    }

    /// Registers a factory function with explicit options.
    ///
    /// Methods with open type arguments become templates, specialised by
    /// unification against each request for a matching shape.
    pub fn add_factory_method_with(&mut self, method: Method, scope: Scope, options: ProviderOptions) -> &mut Self {
        let is_open_generic = method.is_open_generic();
        let source = Arc::new(InstanceSource::FactoryMethod {
            factory_of: method.return_type.clone(),
            method,
            scope,
            is_open_generic,
            is_async: options.is_async,
            disposability: options.disposability,
        });
        if is_open_generic {
            self.open_generic.push(source);
            self
        } else {
            self.declare(source, &options.as_types)
        }
    }

    // ----- Instances and decorators -----

    /// Registers a pre-built value held by a container field or property.
    pub fn add_instance(&mut self, member: Member) -> &mut Self {
        self.declare(Arc::new(InstanceSource::Instance { member }), &[])
    }

    /// Adds an arbitrary, fully specified source.
    pub fn add_source(&mut self, source: InstanceSource) -> &mut Self {
        self.declare(Arc::new(source), &[])
    }

    pub fn add_decorator(&mut self, decorator: DecoratorSource) -> &mut Self {
        self.decorators.push(decorator);
        self
    }

    fn declare(&mut self, source: SourceRef, as_types: &[TypeKey]) -> &mut Self {
        self.declared.push(source.clone());
        for as_type in as_types {
            self.declared.push(InstanceSource::forwarded(as_type.clone(), source.clone()));
        }
        self
    }

    /// Builds the immutable container environment.
    pub fn build(self) -> Environment {
        let mut declared: HashMap<TypeKey, Vec<SourceRef>> = HashMap::new();
        for source in self.declared {
            let list = declared.entry(source.of_type().clone()).or_default();
            // The same source may be declared twice (a shared factory type).
            if !list.contains(&source) {
                list.push(source);
            }
        }
        debug!(
            types = declared.len(),
            open_generic = self.open_generic.len(),
            decorators = self.decorators.len(),
            "Built container environment"
        );
        let decorators = DecoratorResolver::new(self.decorators);
        Environment::container(Registry::new(declared, self.open_generic, decorators))
    }
}
