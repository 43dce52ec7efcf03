//! Provider model: the closed set of instance sources the planner understands.
//!
//! An [`InstanceSource`] is a rule describing how to obtain a value of a given
//! type. Sources are immutable and shared through [`SourceRef`]; nested sources
//! (the underlying provider of a factory, the items of an array) are shared the
//! same way, so the graph is a DAG of `Arc`s rather than a tree of copies.
//!
//! Every traversal of the graph is an exhaustive `match` over the variants, so
//! adding a provider kind is a compile error everywhere it is not yet handled.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::decoration::DecoratorSource;
use crate::key::TypeKey;
use crate::lifetime::Scope;

mod method;

pub use method::{Member, Method, MethodKind, Parameter};

/// Shared handle to a provider.
pub type SourceRef = Arc<InstanceSource>;

/// How a produced value is released.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::Disposability;
///
/// assert!(!Disposability::None.is_disposable());
/// assert!(Disposability::Both.is_disposable());
/// assert_eq!(Disposability::Both.is_async(false), false);
/// assert_eq!(Disposability::Both.is_async(true), true);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Disposability {
    /// Nothing to release
    #[default]
    None,
    /// Implements [`Dispose`](crate::Dispose)
    Sync,
    /// Implements [`AsyncDispose`](crate::AsyncDispose)
    Async,
    /// Implements both; the disposal style of the enclosing scope decides
    Both,
}

impl Disposability {
    pub fn is_disposable(self) -> bool {
        !matches!(self, Disposability::None)
    }

    /// Whether releasing the value suspends, given the enclosing disposal style.
    pub fn is_async(self, async_style: bool) -> bool {
        match self {
            Disposability::None | Disposability::Sync => false,
            Disposability::Async => true,
            Disposability::Both => async_style,
        }
    }
}

/// A rule describing how to obtain a value of a given type.
///
/// Sources are built by [`ProviderCollection`](crate::ProviderCollection) and
/// synthesized on demand by the [`Environment`](crate::Environment) (arrays,
/// delegates, owned wrappers, decorated and specialized sources).
#[derive(Debug, Clone)]
pub enum InstanceSource {
    /// Constructed by calling `constructor`, optionally followed by an
    /// initialization hook (`is_async` marks the hook as suspending).
    Registration {
        ty: TypeKey,
        scope: Scope,
        constructor: Method,
        requires_initialization: bool,
        is_async: bool,
        disposability: Disposability,
    },
    /// Produced by a factory object's create call, released by its release call.
    Factory {
        factory_of: TypeKey,
        underlying: SourceRef,
        scope: Scope,
        is_async: bool,
    },
    /// Callable producing `return_type` on demand from `parameters`.
    Delegate {
        delegate_type: TypeKey,
        return_type: TypeKey,
        parameters: Vec<Parameter>,
        is_async: bool,
    },
    /// Parameter bound within an enclosing delegate body.
    DelegateParameter {
        parameter: Parameter,
        name: Arc<str>,
        depth: usize,
    },
    /// Invocation of a factory function, possibly an open generic template.
    FactoryMethod {
        method: Method,
        factory_of: TypeKey,
        scope: Scope,
        is_open_generic: bool,
        is_async: bool,
        disposability: Disposability,
    },
    /// Access to a pre-built value held by the container.
    Instance { member: Member },
    /// Fixed collection of every provider of the element type.
    Array {
        array_type: TypeKey,
        element_type: TypeKey,
        items: Vec<SourceRef>,
    },
    /// Decorator applied around `underlying`.
    Decorated {
        decorator: DecoratorSource,
        underlying: SourceRef,
    },
    /// `underlying` exposed as another type. Build with [`InstanceSource::forwarded`].
    Forwarded { as_type: TypeKey, underlying: SourceRef },
    /// Value packaged with a caller-managed dispose handle.
    Owned {
        owned_type: TypeKey,
        value_type: TypeKey,
        is_async: bool,
    },
}

impl InstanceSource {
    /// Exposes `underlying` as `as_type`.
    ///
    /// Returns `underlying` itself when the types already agree, and never
    /// forwards to another forwarded source: chains collapse to the ultimate
    /// underlying provider.
    ///
    /// ```rust
    /// use ferrous_inject::{InstanceSource, Member, TypeKey};
    /// use std::sync::Arc;
    ///
    /// let value = Arc::new(InstanceSource::Instance {
    ///     member: Member::new(TypeKey::named("Container"), "impl", TypeKey::named("Impl")),
    /// });
    /// let once = InstanceSource::forwarded(TypeKey::named("IA"), value.clone());
    /// let twice = InstanceSource::forwarded(TypeKey::named("IB"), once);
    ///
    /// match &*twice {
    ///     InstanceSource::Forwarded { underlying, .. } => assert!(Arc::ptr_eq(underlying, &value)),
    ///     _ => unreachable!(),
    /// }
    /// ```
    pub fn forwarded(as_type: TypeKey, underlying: SourceRef) -> SourceRef {
        if underlying.of_type() == &as_type {
            return underlying;
        }
        let underlying = match &*underlying {
            InstanceSource::Forwarded { underlying: inner, .. } => inner.clone(),
            _ => underlying,
        };
        Arc::new(InstanceSource::Forwarded { as_type, underlying })
    }

    /// The type this source satisfies.
    pub fn of_type(&self) -> &TypeKey {
        match self {
            InstanceSource::Registration { ty, .. } => ty,
            InstanceSource::Factory { factory_of, .. } => factory_of,
            InstanceSource::Delegate { delegate_type, .. } => delegate_type,
            InstanceSource::DelegateParameter { parameter, .. } => &parameter.ty,
            InstanceSource::FactoryMethod { factory_of, .. } => factory_of,
            InstanceSource::Instance { member } => &member.ty,
            InstanceSource::Array { array_type, .. } => array_type,
            InstanceSource::Decorated { decorator, .. } => decorator.decorated_type(),
            InstanceSource::Forwarded { as_type, .. } => as_type,
            InstanceSource::Owned { owned_type, .. } => owned_type,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            InstanceSource::Registration { scope, .. }
            | InstanceSource::Factory { scope, .. }
            | InstanceSource::FactoryMethod { scope, .. } => *scope,
            InstanceSource::Delegate { .. } | InstanceSource::DelegateParameter { .. } => {
                Scope::InstancePerResolution
            }
            InstanceSource::Instance { .. } => Scope::SingleInstance,
            InstanceSource::Array { .. } | InstanceSource::Owned { .. } => Scope::InstancePerDependency,
            InstanceSource::Decorated { underlying, .. } | InstanceSource::Forwarded { underlying, .. } => {
                underlying.scope()
            }
        }
    }

    /// Whether producing the value suspends.
    pub fn is_async(&self) -> bool {
        match self {
            InstanceSource::Registration { is_async, .. }
            | InstanceSource::Factory { is_async, .. }
            | InstanceSource::Delegate { is_async, .. }
            | InstanceSource::FactoryMethod { is_async, .. }
            | InstanceSource::Owned { is_async, .. } => *is_async,
            InstanceSource::Decorated { decorator, .. } => decorator.is_async(),
            InstanceSource::DelegateParameter { .. }
            | InstanceSource::Instance { .. }
            | InstanceSource::Array { .. }
            | InstanceSource::Forwarded { .. } => false,
        }
    }

    /// Whether decorators may wrap this source.
    pub fn can_decorate(&self) -> bool {
        match self {
            InstanceSource::DelegateParameter { .. } => false,
            InstanceSource::Factory { underlying, .. } | InstanceSource::Forwarded { underlying, .. } => {
                underlying.can_decorate()
            }
            _ => true,
        }
    }

    /// Whether the source must be initialized after construction.
    pub fn requires_initialization(&self) -> bool {
        match self {
            InstanceSource::Registration { requires_initialization, .. } => *requires_initialization,
            InstanceSource::Decorated { decorator, .. } => decorator.requires_initialization(),
            _ => false,
        }
    }

    /// Short variant name used in diagnostics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InstanceSource::Registration { .. } => "Registration",
            InstanceSource::Factory { .. } => "Factory",
            InstanceSource::Delegate { .. } => "Delegate",
            InstanceSource::DelegateParameter { .. } => "DelegateParameter",
            InstanceSource::FactoryMethod { .. } => "FactoryMethod",
            InstanceSource::Instance { .. } => "Instance",
            InstanceSource::Array { .. } => "Array",
            InstanceSource::Decorated { .. } => "Decorated",
            InstanceSource::Forwarded { .. } => "Forwarded",
            InstanceSource::Owned { .. } => "Owned",
        }
    }

    fn identity(&self) -> Identity<'_> {
        match self {
            InstanceSource::Registration { ty, scope, .. } => Identity::Registration(ty, *scope),
            InstanceSource::Factory { factory_of, scope, .. } => Identity::Factory(factory_of, *scope),
            InstanceSource::Delegate { delegate_type, .. } => Identity::Delegate(delegate_type),
            InstanceSource::DelegateParameter { parameter, name, depth } => {
                Identity::DelegateParameter(parameter, name, *depth)
            }
            InstanceSource::FactoryMethod { method, scope, .. } => Identity::FactoryMethod(method, *scope),
            InstanceSource::Instance { member } => Identity::Instance(member),
            InstanceSource::Array { array_type, .. } => Identity::Array(array_type),
            InstanceSource::Decorated { decorator, underlying } => Identity::Decorated(decorator, underlying),
            InstanceSource::Forwarded { as_type, underlying } => Identity::Forwarded(as_type, underlying),
            InstanceSource::Owned { owned_type, .. } => Identity::Owned(owned_type),
        }
    }
}

/// Memoization identity of a source.
#[derive(PartialEq, Eq, Hash)]
enum Identity<'a> {
    Registration(&'a TypeKey, Scope),
    Factory(&'a TypeKey, Scope),
    Delegate(&'a TypeKey),
    DelegateParameter(&'a Parameter, &'a str, usize),
    FactoryMethod(&'a Method, Scope),
    Instance(&'a Member),
    Array(&'a TypeKey),
    Decorated(&'a DecoratorSource, &'a SourceRef),
    Forwarded(&'a TypeKey, &'a SourceRef),
    Owned(&'a TypeKey),
}

impl PartialEq for InstanceSource {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for InstanceSource {}

impl Hash for InstanceSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for InstanceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceSource::Registration { constructor, scope, .. } => {
                write!(f, "{} [{}]", constructor, scope)
            }
            InstanceSource::Factory { factory_of, underlying, .. } => {
                write!(f, "{} via factory {}", factory_of, underlying.of_type())
            }
            InstanceSource::FactoryMethod { method, scope, .. } => write!(f, "{} [{}]", method, scope),
            InstanceSource::Instance { member } => write!(f, "{}", member),
            InstanceSource::DelegateParameter { name, parameter, .. } => {
                write!(f, "{}: {}", name, parameter.ty)
            }
            InstanceSource::Decorated { decorator, underlying } => {
                write!(f, "{} decorating {}", decorator, underlying)
            }
            InstanceSource::Forwarded { as_type, underlying } => write!(f, "{} as {}", underlying, as_type),
            other => write!(f, "{} {}", other.kind(), other.of_type()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(name: &str, scope: Scope) -> InstanceSource {
        InstanceSource::Registration {
            ty: TypeKey::named(name),
            scope,
            constructor: Method::constructor(TypeKey::named(name), []),
            requires_initialization: false,
            is_async: false,
            disposability: Disposability::None,
        }
    }

    #[test]
    fn registration_identity_is_type_and_scope() {
        let a = registration("A", Scope::SingleInstance);
        let mut b = registration("A", Scope::SingleInstance);
        if let InstanceSource::Registration { requires_initialization, .. } = &mut b {
            *requires_initialization = true;
        }
        assert_eq!(a, b);
        assert_ne!(a, registration("A", Scope::InstancePerDependency));
    }

    #[test]
    fn forwarded_to_same_type_is_identity() {
        let source = Arc::new(registration("A", Scope::InstancePerResolution));
        let forwarded = InstanceSource::forwarded(TypeKey::named("A"), source.clone());
        assert!(Arc::ptr_eq(&source, &forwarded));
    }

    #[test]
    fn forwarded_inherits_scope() {
        let source = Arc::new(registration("A", Scope::SingleInstance));
        let forwarded = InstanceSource::forwarded(TypeKey::named("IA"), source);
        assert_eq!(forwarded.scope(), Scope::SingleInstance);
        assert_eq!(forwarded.of_type(), &TypeKey::named("IA"));
        assert!(!forwarded.is_async());
    }
}
