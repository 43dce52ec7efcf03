//! Collision-free synthetic identifiers.
//!
//! Variables are named `{type}_{depth}_{n}`: the environment depth keeps names
//! of nested delegate bodies apart, and `n` increases monotonically within a
//! lowering session.

use crate::key::TypeKey;

#[derive(Debug, Default)]
pub(crate) struct NameGenerator {
    count: usize,
}

impl NameGenerator {
    pub(crate) fn variable(&mut self, ty: &TypeKey, depth: usize) -> String {
        format!("{}_{}_{}", ty.identifier(), depth, self.next())
    }

    pub(crate) fn owned_function(&mut self, owned_type: &TypeKey) -> String {
        format!("create_{}_{}", owned_type.identifier(), self.next())
    }

    fn next(&mut self) -> usize {
        let n = self.count;
        self.count += 1;
        n
    }
}

/// Member names generated for one single-instance accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorNames {
    /// Field holding the memoized value
    pub field: String,
    /// Lock guarding construction
    pub lock: String,
    /// Field holding the value's dispose action
    pub dispose_action: String,
    /// Accessor function
    pub accessor: String,
}

impl AccessorNames {
    pub(crate) fn new(ty: &TypeKey, index: usize) -> Self {
        let ident = ty.identifier();
        Self {
            field: format!("_{}_field{}", ident, index),
            lock: format!("_lock{}", index),
            dispose_action: format!("_dispose_action{}", index),
            accessor: format!("get_{}_field{}", ident, index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_is_shared_across_kinds() {
        let mut names = NameGenerator::default();
        assert_eq!(names.variable(&TypeKey::named("A"), 0), "a_0_0");
        assert_eq!(names.owned_function(&TypeKey::owned(TypeKey::named("A"))), "create_owned_a_1");
        assert_eq!(names.variable(&TypeKey::named("A"), 2), "a_2_2");
    }

    #[test]
    fn accessor_names() {
        let names = AccessorNames::new(&TypeKey::named("Database"), 3);
        assert_eq!(names.field, "_database_field3");
        assert_eq!(names.accessor, "get_database_field3");
        assert_eq!(names.lock, "_lock3");
    }
}
