//! Provider lifetime definitions.

use std::fmt;

/// Provider lifetimes controlling memoization in generated plans.
///
/// Each scope decides how often a provider's construction appears in the
/// lowered operation list and who disposes the result.
///
/// # Lifetime Characteristics
///
/// - **SingleInstance**: constructed once per container behind a lazily
///   initialized, lock-guarded accessor; disposed at container teardown
/// - **InstancePerResolution**: constructed once per root resolution call;
///   disposed when that call ends
/// - **InstancePerDependency**: constructed at every use site, never shared
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::Scope;
///
/// assert!(Scope::SingleInstance.is_memoized());
/// assert!(Scope::InstancePerResolution.is_memoized());
/// assert!(!Scope::InstancePerDependency.is_memoized());
/// assert_eq!(Scope::default(), Scope::InstancePerResolution);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub enum Scope {
    /// Single instance per container, memoized for the container's lifetime
    ///
    /// The generated accessor constructs the value under a lock the first
    /// time it is requested. All later callers observe the stored value.
    SingleInstance,
    /// Single instance per root resolution
    ///
    /// Every dependent within one resolution call shares the value. The
    /// value is disposed at the end of that call.
    #[default]
    InstancePerResolution,
    /// New instance per use site
    ///
    /// Each reference produces a fresh construction. Such providers are
    /// never memoized by the lowering engine.
    InstancePerDependency,
}

impl Scope {
    /// Whether the lowering engine may reuse an already-lowered value.
    pub fn is_memoized(self) -> bool {
        !matches!(self, Scope::InstancePerDependency)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::SingleInstance => f.write_str("SingleInstance"),
            Scope::InstancePerResolution => f.write_str("InstancePerResolution"),
            Scope::InstancePerDependency => f.write_str("InstancePerDependency"),
        }
    }
}
