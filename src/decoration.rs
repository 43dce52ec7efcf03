//! Decorator declarations and their resolution against concrete types.
//!
//! A decorator wraps the value produced by another provider: one of its
//! parameters (the *decorated parameter*) receives the underlying value and
//! every other parameter is resolved normally. Decorators may be declared for
//! an open generic shape (`Wrapper<T>`, `T[]`, or a bare `T`); the resolver
//! specialises such templates against each concrete request by unification.
//!
//! # Examples
//!
//! ```rust
//! use ferrous_inject::{DecoratorResolver, DecoratorSource, Method, Parameter, TypeKey};
//!
//! let wrapper_of_t = TypeKey::generic("Wrapper", [TypeKey::param("T")]);
//! let logging = DecoratorSource::factory_method(
//!     Method::function(
//!         TypeKey::named("Decorators"),
//!         "log",
//!         [Parameter::required("inner", wrapper_of_t.clone())],
//!         wrapper_of_t.clone(),
//!     )
//!     .with_type_arguments([TypeKey::param("T")]),
//!     0,
//! );
//!
//! let resolver = DecoratorResolver::new([logging]);
//!
//! let wrapped_int = TypeKey::generic("Wrapper", [TypeKey::named("int")]);
//! let matched: Vec<_> = resolver.decorators_for(&wrapped_int).into_iter().collect();
//! assert_eq!(matched.len(), 1);
//! assert_eq!(matched[0].decorated_type(), &wrapped_int);
//!
//! assert!(!resolver.decorators_for(&TypeKey::named("int")).any());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::iter::Chain;
use std::slice;

use crate::key::{Bindings, Shape, TypeKey};
use crate::provider::{Disposability, Method, Parameter};

/// A declared decorator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DecoratorSource {
    /// Decorator type constructed through `constructor`.
    Registration {
        ty: TypeKey,
        decorated_type: TypeKey,
        constructor: Method,
        /// Ordinal of the parameter receiving the underlying value
        decorated_parameter: usize,
        requires_initialization: bool,
        is_async: bool,
        /// Dispose the decorator when its scope ends
        dispose: bool,
        disposability: Disposability,
    },
    /// Decorator function returning the decorated type.
    FactoryMethod {
        method: Method,
        decorated_type: TypeKey,
        decorated_parameter: usize,
        is_async: bool,
        dispose: bool,
        disposability: Disposability,
    },
}

impl DecoratorSource {
    /// Decorator registration for `constructor.owner`, decorating `decorated_type`.
    pub fn registration(constructor: Method, decorated_type: TypeKey, decorated_parameter: usize) -> Self {
        DecoratorSource::Registration {
            ty: constructor.owner.clone(),
            decorated_type,
            constructor,
            decorated_parameter,
            requires_initialization: false,
            is_async: false,
            dispose: false,
            disposability: Disposability::None,
        }
    }

    /// Decorator function. The decorated type is the method's return type.
    pub fn factory_method(method: Method, decorated_parameter: usize) -> Self {
        DecoratorSource::FactoryMethod {
            decorated_type: method.return_type.clone(),
            method,
            decorated_parameter,
            is_async: false,
            dispose: false,
            disposability: Disposability::None,
        }
    }

    /// Marks the decorator as disposable, released when its scope ends.
    pub fn with_dispose(mut self, disposability: Disposability) -> Self {
        match &mut self {
            DecoratorSource::Registration { dispose, disposability: d, .. }
            | DecoratorSource::FactoryMethod { dispose, disposability: d, .. } => {
                *dispose = true;
                *d = disposability;
            }
        }
        self
    }

    /// Marks the decorator as suspending.
    ///
    /// For registrations this means an asynchronous initialization hook.
    pub fn with_async(mut self) -> Self {
        match &mut self {
            DecoratorSource::Registration { is_async, requires_initialization, .. } => {
                *is_async = true;
                *requires_initialization = true;
            }
            DecoratorSource::FactoryMethod { is_async, .. } => *is_async = true,
        }
        self
    }

    pub fn with_initialization(mut self) -> Self {
        if let DecoratorSource::Registration { requires_initialization, .. } = &mut self {
            *requires_initialization = true;
        }
        self
    }

    pub fn decorated_type(&self) -> &TypeKey {
        match self {
            DecoratorSource::Registration { decorated_type, .. }
            | DecoratorSource::FactoryMethod { decorated_type, .. } => decorated_type,
        }
    }

    pub fn decorated_parameter(&self) -> usize {
        match self {
            DecoratorSource::Registration { decorated_parameter, .. }
            | DecoratorSource::FactoryMethod { decorated_parameter, .. } => *decorated_parameter,
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        match self {
            DecoratorSource::Registration { constructor, .. } => &constructor.parameters,
            DecoratorSource::FactoryMethod { method, .. } => &method.parameters,
        }
    }

    pub fn is_async(&self) -> bool {
        match self {
            DecoratorSource::Registration { is_async, .. } | DecoratorSource::FactoryMethod { is_async, .. } => {
                *is_async
            }
        }
    }

    pub fn requires_initialization(&self) -> bool {
        match self {
            DecoratorSource::Registration { requires_initialization, .. } => *requires_initialization,
            DecoratorSource::FactoryMethod { .. } => false,
        }
    }

    /// Disposability of the decorator itself, `None` unless declared with dispose.
    pub fn disposability(&self) -> Disposability {
        match self {
            DecoratorSource::Registration { dispose: true, disposability, .. }
            | DecoratorSource::FactoryMethod { dispose: true, disposability, .. } => *disposability,
            _ => Disposability::None,
        }
    }

    /// Whether the decorated type is still an open template.
    pub fn is_open_generic(&self) -> bool {
        self.decorated_type().is_open()
    }

    /// Specialises the decorator for `concrete`, or `None` when its decorated
    /// type does not unify with `concrete`.
    pub fn specialize(&self, concrete: &TypeKey) -> Option<DecoratorSource> {
        let mut bindings = Bindings::new();
        if !TypeKey::unify(self.decorated_type(), concrete, &mut bindings) {
            return None;
        }
        let mut specialized = self.clone();
        match &mut specialized {
            DecoratorSource::Registration { ty, decorated_type, constructor, .. } => {
                *ty = ty.substitute(&bindings);
                *decorated_type = concrete.clone();
                *constructor = constructor.substitute(&bindings);
            }
            DecoratorSource::FactoryMethod { method, decorated_type, .. } => {
                *method = method.substitute(&bindings);
                *decorated_type = concrete.clone();
            }
        }
        Some(specialized)
    }
}

impl fmt::Display for DecoratorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoratorSource::Registration { constructor, .. } => write!(f, "decorator {}", constructor),
            DecoratorSource::FactoryMethod { method, .. } => write!(f, "decorator {}", method),
        }
    }
}

/// Buckets decorators by the shape of their decorated type.
#[derive(Debug, Default)]
pub struct DecoratorResolver {
    by_shape: HashMap<Shape, Vec<DecoratorSource>>,
    type_parameter: Vec<DecoratorSource>,
}

impl DecoratorResolver {
    /// Builds the resolver, preserving declaration order within every bucket.
    pub fn new(decorators: impl IntoIterator<Item = DecoratorSource>) -> Self {
        let mut resolver = Self::default();
        for decorator in decorators {
            match decorator.decorated_type().shape() {
                Shape::Param => resolver.type_parameter.push(decorator),
                shape => resolver.by_shape.entry(shape).or_default().push(decorator),
            }
        }
        resolver
    }

    pub fn is_empty(&self) -> bool {
        self.by_shape.is_empty() && self.type_parameter.is_empty()
    }

    /// Decorators applicable to `ty`, specialised, in declaration order.
    ///
    /// The query is lazy and can be iterated any number of times.
    pub fn decorators_for<'a>(&'a self, ty: &'a TypeKey) -> DecoratorQuery<'a> {
        let own = self
            .by_shape
            .get(&ty.shape())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        DecoratorQuery { own, type_parameter: &self.type_parameter, ty }
    }
}

/// Lazy, restartable sequence of decorators matching a type.
#[derive(Debug, Clone, Copy)]
pub struct DecoratorQuery<'a> {
    own: &'a [DecoratorSource],
    type_parameter: &'a [DecoratorSource],
    ty: &'a TypeKey,
}

impl<'a> DecoratorQuery<'a> {
    pub fn iter(&self) -> DecoratorIter<'a> {
        DecoratorIter {
            candidates: self.own.iter().chain(self.type_parameter.iter()),
            ty: self.ty,
        }
    }

    /// Whether at least one decorator applies, without specialising the rest.
    pub fn any(&self) -> bool {
        self.iter().next().is_some()
    }
}

impl<'a> IntoIterator for DecoratorQuery<'a> {
    type Item = DecoratorSource;
    type IntoIter = DecoratorIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`DecoratorQuery`].
#[derive(Debug, Clone)]
pub struct DecoratorIter<'a> {
    candidates: Chain<slice::Iter<'a, DecoratorSource>, slice::Iter<'a, DecoratorSource>>,
    ty: &'a TypeKey,
}

impl Iterator for DecoratorIter<'_> {
    type Item = DecoratorSource;

    fn next(&mut self) -> Option<Self::Item> {
        let ty = self.ty;
        self.candidates.find_map(|candidate| candidate.specialize(ty))
    }
}
