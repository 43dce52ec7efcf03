//! Scope environment: the chained, immutable type → provider lookup.
//!
//! An [`Environment`] is a persistent singly-linked chain of frames ending in
//! the container frame. Entering a delegate body pushes a frame binding its
//! parameters; entering an owned scope pushes an empty frame; entering a
//! single-instance provider jumps back to the container frame, since
//! singletons never see delegate parameters. Frames are never mutated, so
//! sibling branches of a traversal can share ancestors freely.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::decoration::DecoratorResolver;
use crate::key::{Bindings, TypeKey};
use crate::lifetime::Scope;
use crate::provider::{InstanceSource, Parameter, SourceRef};

/// Outcome of resolving a type in an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one source satisfies the type
    Found(SourceRef),
    /// Nothing satisfies the type
    Missing,
    /// Several declared sources satisfy the type
    Ambiguous(usize),
}

impl Resolution {
    pub fn into_source(self) -> Option<SourceRef> {
        match self {
            Resolution::Found(source) => Some(source),
            Resolution::Missing | Resolution::Ambiguous(_) => None,
        }
    }
}

/// Container-wide declarations shared by every frame.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    declared: HashMap<TypeKey, Vec<SourceRef>>,
    open_generic: Vec<SourceRef>,
    decorators: DecoratorResolver,
}

impl Registry {
    pub(crate) fn new(
        declared: HashMap<TypeKey, Vec<SourceRef>>,
        open_generic: Vec<SourceRef>,
        decorators: DecoratorResolver,
    ) -> Self {
        Self { declared, open_generic, decorators }
    }

    pub(crate) fn declared_types(&self) -> usize {
        self.declared.len()
    }

    fn resolve(&self, ty: &TypeKey) -> Resolution {
        if let Some(sources) = self.declared.get(ty) {
            return match sources.as_slice() {
                [single] => Resolution::Found(self.decorate(single.clone())),
                many => Resolution::Ambiguous(many.len()),
            };
        }
        match self.synthesize(ty) {
            Resolution::Found(source) => Resolution::Found(self.decorate(source)),
            other => other,
        }
    }

    fn synthesize(&self, ty: &TypeKey) -> Resolution {
        match ty {
            TypeKey::Array(element) => {
                let items = match self.declared.get(element.as_ref()) {
                    Some(sources) => sources.iter().map(|s| self.decorate(s.clone())).collect(),
                    None => self
                        .specialize_generic(element)
                        .into_source()
                        .map(|s| vec![self.decorate(s)])
                        .unwrap_or_default(),
                };
                Resolution::Found(Arc::new(InstanceSource::Array {
                    array_type: ty.clone(),
                    element_type: element.as_ref().clone(),
                    items,
                }))
            }
            TypeKey::Delegate { params, ret, is_async } => Resolution::Found(Arc::new(InstanceSource::Delegate {
                delegate_type: ty.clone(),
                return_type: ret.as_ref().clone(),
                parameters: params
                    .iter()
                    .enumerate()
                    .map(|(ordinal, p)| Parameter {
                        ordinal,
                        ..Parameter::required(&format!("arg{}", ordinal), p.clone())
                    })
                    .collect(),
                is_async: *is_async,
            })),
            TypeKey::Owned { value, is_async } => Resolution::Found(Arc::new(InstanceSource::Owned {
                owned_type: ty.clone(),
                value_type: value.as_ref().clone(),
                is_async: *is_async,
            })),
            _ => self.specialize_generic(ty),
        }
    }

    /// Unifies every open-generic factory method against `ty`.
    fn specialize_generic(&self, ty: &TypeKey) -> Resolution {
        let mut matches = self.open_generic.iter().filter_map(|source| match &**source {
            InstanceSource::FactoryMethod { method, factory_of, scope, is_async, disposability, .. } => {
                let mut bindings = Bindings::new();
                if !TypeKey::unify(factory_of, ty, &mut bindings) {
                    return None;
                }
                Some(Arc::new(InstanceSource::FactoryMethod {
                    method: method.substitute(&bindings),
                    factory_of: ty.clone(),
                    scope: *scope,
                    is_open_generic: false,
                    is_async: *is_async,
                    disposability: *disposability,
                }))
            }
            _ => None,
        });
        match (matches.next(), matches.count()) {
            (None, _) => Resolution::Missing,
            (Some(source), 0) => Resolution::Found(source),
            (Some(_), rest) => Resolution::Ambiguous(rest + 1),
        }
    }

    /// Wraps `source` in every applicable decorator; the first declared is innermost.
    fn decorate(&self, source: SourceRef) -> SourceRef {
        if !source.can_decorate() {
            return source;
        }
        let ty = source.of_type().clone();
        self.decorators
            .decorators_for(&ty)
            .into_iter()
            .fold(source, |underlying, decorator| {
                Arc::new(InstanceSource::Decorated { decorator, underlying })
            })
    }
}

struct Frame {
    parent: Option<Environment>,
    bindings: HashMap<TypeKey, SourceRef>,
    depth: usize,
    registry: Arc<Registry>,
}

/// Immutable chained lookup from a requested type to its provider.
///
/// Cloning is cheap: environments share frames through `Arc`.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Method, Parameter, ProviderCollection, Scope, TypeKey};
///
/// let mut services = ProviderCollection::new();
/// services.add_registration(
///     Method::constructor(TypeKey::named("A"), [Parameter::required("b", TypeKey::named("B"))]),
///     Scope::InstancePerResolution,
/// );
/// services.add_registration(Method::constructor(TypeKey::named("B"), []), Scope::InstancePerResolution);
/// let container = services.build();
///
/// // Requesting Func<B, A> produces a delegate; inside its body `B` is the
/// // delegate's parameter rather than the container registration.
/// let func = TypeKey::delegate([TypeKey::named("B")], TypeKey::named("A"));
/// let delegate = container.lookup(&func).unwrap();
/// let body = container.enter(&delegate);
///
/// assert_eq!(body.depth(), 1);
/// assert_eq!(body.lookup(&TypeKey::named("B")).unwrap().kind(), "DelegateParameter");
/// assert_eq!(container.lookup(&TypeKey::named("B")).unwrap().kind(), "Registration");
/// ```
#[derive(Clone)]
pub struct Environment {
    frame: Arc<Frame>,
}

impl Environment {
    pub(crate) fn container(registry: Registry) -> Self {
        Self {
            frame: Arc::new(Frame {
                parent: None,
                bindings: HashMap::new(),
                depth: 0,
                registry: Arc::new(registry),
            }),
        }
    }

    /// Nesting depth; 0 for the container environment.
    pub fn depth(&self) -> usize {
        self.frame.depth
    }

    pub fn is_container(&self) -> bool {
        self.frame.parent.is_none()
    }

    /// Whether both handles refer to the same frame.
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.frame, &other.frame)
    }

    /// The outermost (container) environment of this chain.
    pub fn root(&self) -> Environment {
        let mut env = self;
        while let Some(parent) = &env.frame.parent {
            env = parent;
        }
        env.clone()
    }

    /// Provider for `ty`, innermost frame first.
    pub fn lookup(&self, ty: &TypeKey) -> Option<SourceRef> {
        self.resolve(ty).into_source()
    }

    /// Like [`lookup`](Self::lookup), distinguishing missing from ambiguous.
    pub fn resolve(&self, ty: &TypeKey) -> Resolution {
        let mut env = self;
        loop {
            if let Some(source) = env.frame.bindings.get(ty) {
                return Resolution::Found(source.clone());
            }
            match &env.frame.parent {
                Some(parent) => env = parent,
                None => return env.frame.registry.resolve(ty),
            }
        }
    }

    /// Provider for a constructor or factory parameter.
    pub fn parameter_source(&self, parameter: &Parameter) -> Option<SourceRef> {
        self.lookup(&parameter.ty)
    }

    /// Environment in which the body of `source` is resolved.
    pub fn enter(&self, source: &InstanceSource) -> Environment {
        match source {
            InstanceSource::Delegate { parameters, .. } => {
                let depth = self.frame.depth + 1;
                let mut bindings = HashMap::with_capacity(parameters.len());
                for (index, parameter) in parameters.iter().enumerate() {
                    bindings.entry(parameter.ty.clone()).or_insert_with(|| {
                        Arc::new(InstanceSource::DelegateParameter {
                            parameter: parameter.clone(),
                            name: Arc::from(format!("param{}_{}", depth, index)),
                            depth,
                        })
                    });
                }
                self.push(bindings)
            }
            InstanceSource::Owned { .. } => self.push(HashMap::new()),
            _ if source.scope() == Scope::SingleInstance => self.root(),
            _ => self.clone(),
        }
    }

    fn push(&self, bindings: HashMap<TypeKey, SourceRef>) -> Environment {
        Environment {
            frame: Arc::new(Frame {
                parent: Some(self.clone()),
                bindings,
                depth: self.frame.depth + 1,
                registry: self.frame.registry.clone(),
            }),
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("depth", &self.frame.depth)
            .field("bindings", &self.frame.bindings.len())
            .field("declared_types", &self.frame.registry.declared_types())
            .finish()
    }
}
