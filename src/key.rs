//! Structural type keys used to identify what a provider produces.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Type-parameter bindings produced by [`TypeKey::unify`].
pub type Bindings = BTreeMap<Arc<str>, TypeKey>;

/// Key describing a type requested from, or produced by, a provider.
///
/// Keys compare structurally: two instantiations of the same generic
/// definition with equal arguments are equal and hash identically. The host
/// type system is out of scope; `TypeKey` carries exactly the structure the
/// planner needs (generic shape for decorator unification, delegate and owned
/// wrappers, pointer-ness for the unsafe analysis).
///
/// # Key Types
///
/// - **Named**: a named type, optionally generic (`Wrapper<int>`)
/// - **Array**: a fixed collection of an element type (`int[]`)
/// - **Pointer / FunctionPointer**: unsafe memory types
/// - **Delegate**: a callable producing a value, possibly asynchronously
/// - **Owned**: a value packaged with a caller-managed dispose handle
/// - **Param**: an open type parameter, only valid inside templates
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::TypeKey;
///
/// let wrapper = TypeKey::generic("Wrapper", [TypeKey::named("int")]);
/// assert_eq!(wrapper.to_string(), "Wrapper<int>");
/// assert_eq!(wrapper, TypeKey::generic("Wrapper", [TypeKey::named("int")]));
///
/// let func = TypeKey::delegate([TypeKey::named("int")], TypeKey::named("A"));
/// assert_eq!(func.to_string(), "Func<int, A>");
///
/// assert!(TypeKey::pointer(TypeKey::named("byte")).is_unsafe());
/// assert!(!TypeKey::array(TypeKey::named("byte")).is_unsafe());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKey {
    /// Named type with generic arguments (empty for non-generic types)
    Named { name: Arc<str>, args: Vec<TypeKey> },
    /// Array of the element type
    Array(Box<TypeKey>),
    /// Raw pointer to the element type
    Pointer(Box<TypeKey>),
    /// Function pointer
    FunctionPointer { params: Vec<TypeKey>, ret: Box<TypeKey> },
    /// Delegate taking `params` and producing `ret`
    Delegate { params: Vec<TypeKey>, ret: Box<TypeKey>, is_async: bool },
    /// Value paired with an explicit dispose handle
    Owned { value: Box<TypeKey>, is_async: bool },
    /// Open type parameter
    Param(Arc<str>),
}

/// Shape of a type, used to bucket decorator templates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Shape {
    Named(Arc<str>, usize),
    Array,
    Pointer,
    FunctionPointer(usize),
    Delegate(usize, bool),
    Owned(bool),
    Param,
}

impl TypeKey {
    /// Non-generic named type.
    pub fn named(name: &str) -> Self {
        TypeKey::Named { name: Arc::from(name), args: Vec::new() }
    }

    /// Generic named type.
    pub fn generic(name: &str, args: impl IntoIterator<Item = TypeKey>) -> Self {
        TypeKey::Named { name: Arc::from(name), args: args.into_iter().collect() }
    }

    pub fn array(element: TypeKey) -> Self {
        TypeKey::Array(Box::new(element))
    }

    pub fn pointer(element: TypeKey) -> Self {
        TypeKey::Pointer(Box::new(element))
    }

    pub fn function_pointer(params: impl IntoIterator<Item = TypeKey>, ret: TypeKey) -> Self {
        TypeKey::FunctionPointer { params: params.into_iter().collect(), ret: Box::new(ret) }
    }

    /// Synchronous delegate type.
    pub fn delegate(params: impl IntoIterator<Item = TypeKey>, ret: TypeKey) -> Self {
        TypeKey::Delegate { params: params.into_iter().collect(), ret: Box::new(ret), is_async: false }
    }

    /// Delegate whose invocation suspends.
    pub fn async_delegate(params: impl IntoIterator<Item = TypeKey>, ret: TypeKey) -> Self {
        TypeKey::Delegate { params: params.into_iter().collect(), ret: Box::new(ret), is_async: true }
    }

    pub fn owned(value: TypeKey) -> Self {
        TypeKey::Owned { value: Box::new(value), is_async: false }
    }

    pub fn async_owned(value: TypeKey) -> Self {
        TypeKey::Owned { value: Box::new(value), is_async: true }
    }

    /// Open type parameter.
    pub fn param(name: &str) -> Self {
        TypeKey::Param(Arc::from(name))
    }

    /// Element type of an array key.
    pub fn element_type(&self) -> Option<&TypeKey> {
        match self {
            TypeKey::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Whether producing a value of this type requires unsafe code.
    pub fn is_unsafe(&self) -> bool {
        match self {
            TypeKey::Pointer(_) | TypeKey::FunctionPointer { .. } => true,
            TypeKey::Array(elem) => elem.is_unsafe(),
            _ => false,
        }
    }

    /// Whether the key mentions any type parameter.
    pub fn is_open(&self) -> bool {
        match self {
            TypeKey::Param(_) => true,
            TypeKey::Named { args, .. } => args.iter().any(TypeKey::is_open),
            TypeKey::Array(elem) | TypeKey::Pointer(elem) => elem.is_open(),
            TypeKey::FunctionPointer { params, ret } | TypeKey::Delegate { params, ret, .. } => {
                ret.is_open() || params.iter().any(TypeKey::is_open)
            }
            TypeKey::Owned { value, .. } => value.is_open(),
        }
    }

    pub(crate) fn shape(&self) -> Shape {
        match self {
            TypeKey::Named { name, args } => Shape::Named(name.clone(), args.len()),
            TypeKey::Array(_) => Shape::Array,
            TypeKey::Pointer(_) => Shape::Pointer,
            TypeKey::FunctionPointer { params, .. } => Shape::FunctionPointer(params.len()),
            TypeKey::Delegate { params, is_async, .. } => Shape::Delegate(params.len(), *is_async),
            TypeKey::Owned { is_async, .. } => Shape::Owned(*is_async),
            TypeKey::Param(_) => Shape::Param,
        }
    }

    /// Unifies a template against a concrete type, extending `bindings`.
    ///
    /// Returns `false` when the shapes differ or a parameter would need two
    /// different bindings. `bindings` may be partially extended on failure;
    /// callers discard it in that case.
    ///
    /// ```rust
    /// use ferrous_inject::{Bindings, TypeKey};
    ///
    /// let template = TypeKey::generic("Wrapper", [TypeKey::param("T")]);
    /// let concrete = TypeKey::generic("Wrapper", [TypeKey::named("int")]);
    ///
    /// let mut bindings = Bindings::new();
    /// assert!(TypeKey::unify(&template, &concrete, &mut bindings));
    /// assert_eq!(bindings["T"], TypeKey::named("int"));
    ///
    /// let mut bindings = Bindings::new();
    /// assert!(!TypeKey::unify(&template, &TypeKey::named("int"), &mut bindings));
    /// ```
    pub fn unify(pattern: &TypeKey, concrete: &TypeKey, bindings: &mut Bindings) -> bool {
        match (pattern, concrete) {
            (TypeKey::Param(name), _) => match bindings.get(name) {
                Some(bound) => bound == concrete,
                None => {
                    bindings.insert(name.clone(), concrete.clone());
                    true
                }
            },
            (TypeKey::Named { name: pn, args: pa }, TypeKey::Named { name: cn, args: ca }) => {
                pn == cn && unify_all(pa, ca, bindings)
            }
            (TypeKey::Array(p), TypeKey::Array(c)) | (TypeKey::Pointer(p), TypeKey::Pointer(c)) => {
                TypeKey::unify(p, c, bindings)
            }
            (
                TypeKey::FunctionPointer { params: pp, ret: pr },
                TypeKey::FunctionPointer { params: cp, ret: cr },
            ) => unify_all(pp, cp, bindings) && TypeKey::unify(pr, cr, bindings),
            (
                TypeKey::Delegate { params: pp, ret: pr, is_async: pa },
                TypeKey::Delegate { params: cp, ret: cr, is_async: ca },
            ) => pa == ca && unify_all(pp, cp, bindings) && TypeKey::unify(pr, cr, bindings),
            (TypeKey::Owned { value: pv, is_async: pa }, TypeKey::Owned { value: cv, is_async: ca }) => {
                pa == ca && TypeKey::unify(pv, cv, bindings)
            }
            _ => false,
        }
    }

    /// Replaces bound type parameters. Unbound parameters are kept.
    pub fn substitute(&self, bindings: &Bindings) -> TypeKey {
        if bindings.is_empty() {
            return self.clone();
        }
        match self {
            TypeKey::Param(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            TypeKey::Named { name, args } => TypeKey::Named {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            TypeKey::Array(elem) => TypeKey::Array(Box::new(elem.substitute(bindings))),
            TypeKey::Pointer(elem) => TypeKey::Pointer(Box::new(elem.substitute(bindings))),
            TypeKey::FunctionPointer { params, ret } => TypeKey::FunctionPointer {
                params: params.iter().map(|p| p.substitute(bindings)).collect(),
                ret: Box::new(ret.substitute(bindings)),
            },
            TypeKey::Delegate { params, ret, is_async } => TypeKey::Delegate {
                params: params.iter().map(|p| p.substitute(bindings)).collect(),
                ret: Box::new(ret.substitute(bindings)),
                is_async: *is_async,
            },
            TypeKey::Owned { value, is_async } => TypeKey::Owned {
                value: Box::new(value.substitute(bindings)),
                is_async: *is_async,
            },
        }
    }

    /// Lower-case identifier fragment used for synthetic variable names.
    ///
    /// ```rust
    /// use ferrous_inject::TypeKey;
    ///
    /// assert_eq!(TypeKey::named("Database").identifier(), "database");
    /// assert_eq!(
    ///     TypeKey::generic("Wrapper", [TypeKey::named("int")]).identifier(),
    ///     "wrapper_int"
    /// );
    /// assert_eq!(TypeKey::array(TypeKey::named("A")).identifier(), "a_array");
    /// ```
    pub fn identifier(&self) -> String {
        match self {
            TypeKey::Named { name, args } => {
                let mut out = sanitize(name);
                for arg in args {
                    out.push('_');
                    out.push_str(&arg.identifier());
                }
                out
            }
            TypeKey::Array(elem) => format!("{}_array", elem.identifier()),
            TypeKey::Pointer(elem) => format!("{}_ptr", elem.identifier()),
            TypeKey::FunctionPointer { ret, .. } => format!("fnptr_{}", ret.identifier()),
            TypeKey::Delegate { ret, .. } => format!("func_{}", ret.identifier()),
            TypeKey::Owned { value, .. } => format!("owned_{}", value.identifier()),
            TypeKey::Param(name) => sanitize(name),
        }
    }
}

fn unify_all(patterns: &[TypeKey], concretes: &[TypeKey], bindings: &mut Bindings) -> bool {
    patterns.len() == concretes.len()
        && patterns
            .iter()
            .zip(concretes)
            .all(|(p, c)| TypeKey::unify(p, c, bindings))
}

fn sanitize(name: &str) -> String {
    let simple = name.rsplit("::").next().unwrap_or(name);
    simple
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeKey]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i != 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKey::Named { name, args } if args.is_empty() => f.write_str(name),
            TypeKey::Named { name, args } => {
                write!(f, "{}<", name)?;
                write_list(f, args)?;
                f.write_str(">")
            }
            TypeKey::Array(elem) => write!(f, "{}[]", elem),
            TypeKey::Pointer(elem) => write!(f, "{}*", elem),
            TypeKey::FunctionPointer { params, ret } => {
                f.write_str("delegate*<")?;
                for param in params {
                    write!(f, "{}, ", param)?;
                }
                write!(f, "{}>", ret)
            }
            TypeKey::Delegate { params, ret, is_async } => {
                f.write_str("Func<")?;
                for param in params {
                    write!(f, "{}, ", param)?;
                }
                if *is_async {
                    write!(f, "Task<{}>>", ret)
                } else {
                    write!(f, "{}>", ret)
                }
            }
            TypeKey::Owned { value, is_async: false } => write!(f, "Owned<{}>", value),
            TypeKey::Owned { value, is_async: true } => write!(f, "AsyncOwned<{}>", value),
            TypeKey::Param(name) => f.write_str(name),
        }
    }
}
