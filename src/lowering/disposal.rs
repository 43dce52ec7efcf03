//! Attaches disposal handles to statements at creation time.

use crate::provider::InstanceSource;

use super::operation::{Disposal, Statement};

/// What decided the disposal style of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StyleDeterminant {
    /// Whether the container is disposed asynchronously
    Container,
    /// Whether the enclosing owned wrapper is an async owned
    OwnedType,
}

/// Whether values implementing both dispose flavours are released asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DisposalStyle {
    pub(crate) is_async: bool,
    pub(crate) determinant: StyleDeterminant,
}

impl DisposalStyle {
    pub(crate) fn container(is_async: bool) -> Self {
        Self { is_async, determinant: StyleDeterminant::Container }
    }

    pub(crate) fn owned(is_async: bool) -> Self {
        Self { is_async, determinant: StyleDeterminant::OwnedType }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DisposalLowerer {
    style: DisposalStyle,
}

impl DisposalLowerer {
    pub(crate) fn new(style: DisposalStyle) -> Self {
        Self { style }
    }

    pub(crate) fn style(&self) -> DisposalStyle {
        self.style
    }

    pub(crate) fn with_style(&self, style: DisposalStyle) -> Self {
        Self { style }
    }

    /// Disposal for the value `statement` creates, released through
    /// `variable_to_dispose` (which differs from the statement's own variable
    /// when the statement produces a task).
    pub(crate) fn create_disposal(&self, statement: &Statement, variable_to_dispose: &str) -> Option<Disposal> {
        match statement {
            Statement::DependencyCreation { source, arguments, .. } => match &**source {
                InstanceSource::Factory { is_async, .. } => Some(Disposal::Factory {
                    variable: variable_to_dispose.to_string(),
                    factory: arguments.first().cloned().flatten()?,
                    is_async: *is_async,
                }),
                InstanceSource::Registration { disposability, .. }
                | InstanceSource::FactoryMethod { disposability, .. } => {
                    self.interface(disposability.is_disposable(), disposability.is_async(self.style.is_async), variable_to_dispose)
                }
                InstanceSource::Decorated { decorator, .. } => {
                    let disposability = decorator.disposability();
                    self.interface(disposability.is_disposable(), disposability.is_async(self.style.is_async), variable_to_dispose)
                }
                InstanceSource::Delegate { .. }
                | InstanceSource::DelegateParameter { .. }
                | InstanceSource::Instance { .. }
                | InstanceSource::Array { .. }
                | InstanceSource::Forwarded { .. }
                | InstanceSource::Owned { .. } => None,
            },
            Statement::DelegateCreation { plan, dispose_actions, .. } => {
                let mut disposals = plan.operations.iter().filter_map(|op| op.disposal.as_ref()).peekable();
                disposals.peek()?;
                let any_async = disposals.any(Disposal::is_async);
                Some(Disposal::Delegate {
                    dispose_actions: dispose_actions.clone(),
                    is_async: any_async || self.style.is_async,
                })
            }
            Statement::SingleInstanceReference { .. }
            | Statement::DisposeActionsCreation { .. }
            | Statement::OwnedCreationFunction { .. }
            | Statement::OwnedCreation { .. }
            | Statement::Initialization { .. }
            | Statement::Await { .. } => None,
        }
    }

    fn interface(&self, disposable: bool, is_async: bool, variable: &str) -> Option<Disposal> {
        disposable.then(|| Disposal::Interface { variable: variable.to_string(), is_async })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::key::TypeKey;
    use crate::lifetime::Scope;
    use crate::provider::{Disposability, Method};

    fn creation(disposability: Disposability) -> Statement {
        Statement::DependencyCreation {
            variable: "a_0_0".to_string(),
            source: Arc::new(InstanceSource::Registration {
                ty: TypeKey::named("A"),
                scope: Scope::InstancePerResolution,
                constructor: Method::constructor(TypeKey::named("A"), []),
                requires_initialization: false,
                is_async: false,
                disposability,
            }),
            arguments: Vec::new(),
        }
    }

    #[test]
    fn both_follows_style() {
        let sync = DisposalLowerer::new(DisposalStyle::container(false));
        let asynchronous = sync.with_style(DisposalStyle::owned(true));

        assert_eq!(
            sync.create_disposal(&creation(Disposability::Both), "a_0_0"),
            Some(Disposal::Interface { variable: "a_0_0".to_string(), is_async: false })
        );
        assert_eq!(
            asynchronous.create_disposal(&creation(Disposability::Both), "a_0_0"),
            Some(Disposal::Interface { variable: "a_0_0".to_string(), is_async: true })
        );
        assert_eq!(asynchronous.style().determinant, StyleDeterminant::OwnedType);
    }

    #[test]
    fn non_disposable_has_no_handle() {
        let lowerer = DisposalLowerer::new(DisposalStyle::container(true));
        assert_eq!(lowerer.create_disposal(&creation(Disposability::None), "a_0_0"), None);
    }
}
