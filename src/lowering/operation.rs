//! Lowering output: operations, statements, disposal handles and plans.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::decoration::DecoratorSource;
use crate::key::TypeKey;
use crate::provider::{InstanceSource, SourceRef};

/// Shared handle to an operation. Dependencies point at earlier operations.
pub type OperationRef = Arc<Operation>;

/// How the value created by an operation is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposal {
    /// Call the value's dispose method
    Interface { variable: String, is_async: bool },
    /// Hand the value back to its factory's release call
    Factory { variable: String, factory: String, is_async: bool },
    /// Drain the delegate's dispose-actions registry in reverse
    Delegate { dispose_actions: String, is_async: bool },
}

impl Disposal {
    pub fn is_async(&self) -> bool {
        match self {
            Disposal::Interface { is_async, .. }
            | Disposal::Factory { is_async, .. }
            | Disposal::Delegate { is_async, .. } => *is_async,
        }
    }
}

impl fmt::Display for Disposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = if self.is_async() { "_async" } else { "" };
        match self {
            Disposal::Interface { variable, .. } => write!(f, "{}.dispose{}()", variable, suffix),
            Disposal::Factory { variable, factory, .. } => write!(f, "{}.release{}({})", factory, suffix, variable),
            Disposal::Delegate { dispose_actions, .. } => write!(f, "{}.drain{}()", dispose_actions, suffix),
        }
    }
}

/// One atomic lowered step.
#[derive(Debug, Clone)]
pub enum Statement {
    /// Call to a single-instance accessor.
    SingleInstanceReference { variable: String, source: SourceRef, is_async: bool },
    /// Creation of a delegate whose body is the nested plan.
    DelegateCreation {
        variable: String,
        source: SourceRef,
        plan: Plan,
        /// Registry the body's disposals are pushed onto
        dispose_actions: String,
    },
    /// Creation of a delegate's dispose-actions registry.
    DisposeActionsCreation { variable: String, is_async: bool },
    /// Local function producing an owned value from the nested plan.
    OwnedCreationFunction {
        function: String,
        source: SourceRef,
        is_async_context: bool,
        plan: Plan,
    },
    /// Eager call of an owned-creation function.
    OwnedCreation {
        variable: String,
        source: SourceRef,
        is_async_context: bool,
        function: String,
    },
    /// Constructor, factory, member access, array build or forwarding cast.
    ///
    /// `arguments` follow parameter order; `None` marks an omitted optional
    /// parameter. For asynchronous creations `variable` holds the task.
    DependencyCreation {
        variable: String,
        source: SourceRef,
        arguments: Vec<Option<String>>,
    },
    /// Initialization hook of `variable`.
    Initialization {
        task_variable: Option<String>,
        variable: String,
        is_async: bool,
    },
    /// Suspension until `task` completes, optionally binding its result.
    Await {
        variable: Option<String>,
        task: String,
        ty: Option<TypeKey>,
    },
}

impl Statement {
    /// Variable declared by the statement, with its type.
    pub fn declaration(&self) -> Option<Declaration> {
        let task_of = |ty: &TypeKey| TypeKey::generic("Task", [ty.clone()]);
        match self {
            Statement::SingleInstanceReference { variable, source, is_async } => Some(Declaration {
                name: variable.clone(),
                ty: if *is_async { task_of(source.of_type()) } else { source.of_type().clone() },
            }),
            Statement::DelegateCreation { variable, source, .. }
            | Statement::OwnedCreation { variable, source, .. } => {
                Some(Declaration { name: variable.clone(), ty: source.of_type().clone() })
            }
            Statement::DisposeActionsCreation { variable, .. } => {
                Some(Declaration { name: variable.clone(), ty: TypeKey::named("DisposeActions") })
            }
            Statement::DependencyCreation { variable, source, .. } => Some(Declaration {
                name: variable.clone(),
                ty: if source.is_async() && !source.requires_initialization() {
                    task_of(source.of_type())
                } else {
                    source.of_type().clone()
                },
            }),
            Statement::Initialization { task_variable: Some(task), .. } => {
                Some(Declaration { name: task.clone(), ty: TypeKey::named("Task") })
            }
            Statement::Await { variable: Some(variable), ty: Some(ty), .. } => {
                Some(Declaration { name: variable.clone(), ty: ty.clone() })
            }
            Statement::OwnedCreationFunction { .. } | Statement::Initialization { .. } | Statement::Await { .. } => {
                None
            }
        }
    }

    pub fn is_await(&self) -> bool {
        matches!(self, Statement::Await { .. })
    }

    /// Whether the statement starts a suspension whose result is awaited later.
    pub fn starts_suspension(&self) -> bool {
        match self {
            Statement::Initialization { is_async, .. } | Statement::SingleInstanceReference { is_async, .. } => {
                *is_async
            }
            Statement::DependencyCreation { source, .. } => match &**source {
                InstanceSource::FactoryMethod { is_async, .. } | InstanceSource::Factory { is_async, .. } => *is_async,
                InstanceSource::Decorated { decorator, .. } => {
                    matches!(decorator, DecoratorSource::FactoryMethod { is_async: true, .. })
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Source the statement was lowered from, if any.
    pub fn source(&self) -> Option<&SourceRef> {
        match self {
            Statement::SingleInstanceReference { source, .. }
            | Statement::DelegateCreation { source, .. }
            | Statement::OwnedCreationFunction { source, .. }
            | Statement::OwnedCreation { source, .. }
            | Statement::DependencyCreation { source, .. } => Some(source),
            Statement::DisposeActionsCreation { .. } | Statement::Initialization { .. } | Statement::Await { .. } => {
                None
            }
        }
    }
}

fn write_arguments(f: &mut fmt::Formatter<'_>, arguments: &[Option<String>]) -> fmt::Result {
    for (i, argument) in arguments.iter().enumerate() {
        if i != 0 {
            f.write_str(", ")?;
        }
        f.write_str(argument.as_deref().unwrap_or("_"))?;
    }
    Ok(())
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::SingleInstanceReference { variable, source, is_async } => {
                let suffix = if *is_async { "_async" } else { "" };
                write!(f, "{} = single_instance{}<{}>()", variable, suffix, source.of_type())
            }
            Statement::DelegateCreation { variable, source, plan, .. } => {
                write!(f, "{} = {} {{ {} ops -> {} }}", variable, source.of_type(), plan.len(), plan.target)
            }
            Statement::DisposeActionsCreation { variable, .. } => write!(f, "{} = DisposeActions::new()", variable),
            Statement::OwnedCreationFunction { function, source, plan, .. } => {
                write!(f, "fn {}() -> {} {{ {} ops }}", function, source.of_type(), plan.len())
            }
            Statement::OwnedCreation { variable, function, .. } => write!(f, "{} = {}()", variable, function),
            Statement::DependencyCreation { variable, source, arguments } => {
                write!(f, "{} = ", variable)?;
                match &**source {
                    InstanceSource::Registration { ty, .. } => write!(f, "{}::new(", ty)?,
                    InstanceSource::FactoryMethod { method, .. } => write!(f, "{}.{}(", method.owner, method.name)?,
                    InstanceSource::Factory { .. } => f.write_str("create(")?,
                    InstanceSource::Decorated { decorator, .. } => match decorator {
                        DecoratorSource::Registration { ty, .. } => write!(f, "{}::new(", ty)?,
                        DecoratorSource::FactoryMethod { method, .. } => write!(f, "{}.{}(", method.owner, method.name)?,
                    },
                    InstanceSource::Array { element_type, .. } => write!(f, "[{}; ", element_type)?,
                    InstanceSource::Instance { member } => return write!(f, "{}", member),
                    InstanceSource::Forwarded { as_type, .. } => write!(f, "({} as ", as_type)?,
                    other => write!(f, "{}(", other.kind())?,
                }
                write_arguments(f, arguments)?;
                match &**source {
                    InstanceSource::Array { .. } => f.write_str("]"),
                    _ => f.write_str(")"),
                }
            }
            Statement::Initialization { task_variable: Some(task), variable, .. } => {
                write!(f, "{} = {}.initialize_async()", task, variable)
            }
            Statement::Initialization { task_variable: None, variable, .. } => write!(f, "{}.initialize()", variable),
            Statement::Await { variable: Some(variable), task, .. } => write!(f, "{} = await {}", variable, task),
            Statement::Await { variable: None, task, .. } => write!(f, "await {}", task),
        }
    }
}

/// A variable declared by a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub ty: TypeKey,
}

/// A lowered step and everything it needs.
#[derive(Debug)]
pub struct Operation {
    /// Unique within one lowering session
    pub id: usize,
    pub statement: Statement,
    pub disposal: Option<Disposal>,
    pub dependencies: Vec<OperationRef>,
    /// False when the disposal suspends but the enclosing context cannot
    pub can_dispose_locally: bool,
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Operation {}

/// Ordered operations of one resolution plus the variable holding the result.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{lower_resolution, CancellationToken, Disposability, Method, Parameter,
///     PlannerConfig, ProviderCollection, ProviderOptions, Scope, TypeKey};
///
/// let mut services = ProviderCollection::new();
/// services.add_registration_with(
///     Method::constructor(TypeKey::named("Db"), []),
///     Scope::InstancePerResolution,
///     ProviderOptions::new().disposable(Disposability::Sync),
/// );
/// services.add_registration_with(
///     Method::constructor(TypeKey::named("Repo"), [Parameter::required("db", TypeKey::named("Db"))]),
///     Scope::InstancePerResolution,
///     ProviderOptions::new().disposable(Disposability::Sync),
/// );
/// let container = services.build();
///
/// let root = container.lookup(&TypeKey::named("Repo")).unwrap();
/// let plan = lower_resolution(&root, &container, false, &PlannerConfig::default(), &CancellationToken::new()).unwrap();
///
/// let created: Vec<_> = plan.operations.iter().map(|op| op.statement.to_string()).collect();
/// assert_eq!(created, ["db_0_1 = Db::new()", "repo_0_0 = Repo::new(db_0_1)"]);
/// assert_eq!(plan.target, "repo_0_0");
///
/// let disposed: Vec<_> = plan.disposal_order().map(|op| op.id).collect();
/// assert_eq!(disposed, [plan.operations[1].id, plan.operations[0].id]);
/// ```
#[derive(Debug, Clone)]
pub struct Plan {
    pub operations: Vec<OperationRef>,
    pub target: String,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Disposal-bearing operations in exact reverse creation order.
    pub fn disposal_order(&self) -> impl Iterator<Item = &OperationRef> + '_ {
        self.operations.iter().rev().filter(|op| op.disposal.is_some())
    }

    /// Variables the renderer must declare, in creation order.
    pub fn declarations(&self) -> Vec<Declaration> {
        self.operations.iter().filter_map(|op| op.statement.declaration()).collect()
    }

    /// Operations whose disposal suspends in a context that cannot suspend.
    ///
    /// The renderer reports these as errors rather than dropping them.
    pub fn undisposable_operations(&self) -> Vec<&OperationRef> {
        self.operations
            .iter()
            .filter(|op| op.disposal.is_some() && !op.can_dispose_locally)
            .collect()
    }

    pub fn position(&self, id: usize) -> Option<usize> {
        self.operations.iter().position(|op| op.id == id)
    }

    /// Whether every in-plan dependency precedes its dependent.
    pub fn is_topologically_ordered(&self) -> bool {
        let in_plan: HashSet<usize> = self.operations.iter().map(|op| op.id).collect();
        let mut seen = HashSet::with_capacity(in_plan.len());
        for op in &self.operations {
            if op
                .dependencies
                .iter()
                .any(|dep| in_plan.contains(&dep.id) && !seen.contains(&dep.id))
            {
                return false;
            }
            seen.insert(op.id);
        }
        true
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.operations {
            writeln!(f, "{}", op.statement)?;
        }
        for op in self.disposal_order() {
            if let Some(disposal) = &op.disposal {
                writeln!(f, "{}", disposal)?;
            }
        }
        write!(f, "return {}", self.target)
    }
}
