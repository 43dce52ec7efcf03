//! Callable descriptors consumed by providers: methods, parameters and members.

use std::fmt;
use std::sync::Arc;

use crate::key::{Bindings, TypeKey};

/// How a [`Method`] is invoked by generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MethodKind {
    /// `new Owner(..)`
    Constructor,
    /// Static function on the owner type
    Static,
    /// Function invoked on the container instance
    Instance,
}

/// A formal parameter of a constructor or factory function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Parameter {
    pub name: Arc<str>,
    /// Position within the declaring method, assigned by [`Method`]'s constructors
    pub ordinal: usize,
    pub ty: TypeKey,
    /// Optional parameters receive an absent marker when nothing provides them
    pub optional: bool,
}

impl Parameter {
    pub fn required(name: &str, ty: TypeKey) -> Self {
        Self { name: Arc::from(name), ordinal: 0, ty, optional: false }
    }

    pub fn optional(name: &str, ty: TypeKey) -> Self {
        Self { name: Arc::from(name), ordinal: 0, ty, optional: true }
    }
}

/// A constructor or factory function.
///
/// Methods are compared structurally, which is what memoization keys
/// `FactoryMethod` providers on: the same method with the same scope is the
/// same provider.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Method, Parameter, TypeKey};
///
/// let ctor = Method::constructor(
///     TypeKey::named("Service"),
///     [
///         Parameter::required("db", TypeKey::named("Database")),
///         Parameter::optional("log", TypeKey::named("Logger")),
///     ],
/// );
///
/// assert_eq!(ctor.parameters[1].ordinal, 1);
/// assert_eq!(ctor.return_type, TypeKey::named("Service"));
/// assert_eq!(ctor.to_string(), "Service.new(Database, Logger)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Method {
    pub owner: TypeKey,
    pub name: Arc<str>,
    pub kind: MethodKind,
    /// Type arguments; open parameters for generic factory methods
    pub type_arguments: Vec<TypeKey>,
    pub parameters: Vec<Parameter>,
    pub return_type: TypeKey,
}

impl Method {
    /// Constructor of `owner`, returning `owner`.
    pub fn constructor(owner: TypeKey, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        Self {
            return_type: owner.clone(),
            owner,
            name: Arc::from("new"),
            kind: MethodKind::Constructor,
            type_arguments: Vec::new(),
            parameters: number(parameters),
        }
    }

    /// Static factory function.
    pub fn function(
        owner: TypeKey,
        name: &str,
        parameters: impl IntoIterator<Item = Parameter>,
        return_type: TypeKey,
    ) -> Self {
        Self {
            owner,
            name: Arc::from(name),
            kind: MethodKind::Static,
            type_arguments: Vec::new(),
            parameters: number(parameters),
            return_type,
        }
    }

    /// Factory function invoked on the container instance.
    pub fn instance(
        owner: TypeKey,
        name: &str,
        parameters: impl IntoIterator<Item = Parameter>,
        return_type: TypeKey,
    ) -> Self {
        Self { kind: MethodKind::Instance, ..Self::function(owner, name, parameters, return_type) }
    }

    pub fn with_type_arguments(mut self, type_arguments: impl IntoIterator<Item = TypeKey>) -> Self {
        self.type_arguments = type_arguments.into_iter().collect();
        self
    }

    /// Whether any type argument is still an open parameter.
    pub fn is_open_generic(&self) -> bool {
        self.type_arguments.iter().any(TypeKey::is_open)
    }

    pub fn parameter(&self, ordinal: usize) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.ordinal == ordinal)
    }

    /// Applies type-parameter bindings to every type the method mentions.
    pub fn substitute(&self, bindings: &Bindings) -> Method {
        Method {
            owner: self.owner.substitute(bindings),
            name: self.name.clone(),
            kind: self.kind,
            type_arguments: self.type_arguments.iter().map(|t| t.substitute(bindings)).collect(),
            parameters: self
                .parameters
                .iter()
                .map(|p| Parameter { ty: p.ty.substitute(bindings), ..p.clone() })
                .collect(),
            return_type: self.return_type.substitute(bindings),
        }
    }
}

fn number(parameters: impl IntoIterator<Item = Parameter>) -> Vec<Parameter> {
    parameters
        .into_iter()
        .enumerate()
        .map(|(ordinal, p)| Parameter { ordinal, ..p })
        .collect()
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)?;
        if !self.type_arguments.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.type_arguments.iter().enumerate() {
                if i != 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(">")?;
        }
        f.write_str("(")?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param.ty)?;
        }
        f.write_str(")")
    }
}

/// Field or property of the container holding a pre-built value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Member {
    pub owner: TypeKey,
    pub name: Arc<str>,
    pub ty: TypeKey,
}

impl Member {
    pub fn new(owner: TypeKey, name: &str, ty: TypeKey) -> Self {
        Self { owner, name: Arc::from(name), ty }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}
