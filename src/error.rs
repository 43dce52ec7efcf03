//! Error types for the planner and its runtime support.

use thiserror::Error;

/// Fatal planning errors.
///
/// Missing and circular dependencies are *not* errors in this sense: they are
/// reported as [`Diagnostic`](crate::Diagnostic)s through a sink and the
/// affected root is stubbed. A `PlanError` aborts the whole generation pass.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::PlanError;
///
/// let cancelled = PlanError::Cancelled;
/// let unsupported = PlanError::Unsupported("no source for root 'A'".to_string());
/// let depth = PlanError::DepthExceeded(1024);
///
/// assert_eq!(cancelled.to_string(), "Planning was cancelled");
/// assert!(unsupported.to_string().contains("'A'"));
/// assert_eq!(depth.to_string(), "Max depth 1024 exceeded");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The provider model and the lowering engine disagree (an unresolved
    /// provider reached lowering, or the scheduler could not progress).
    #[error("Unsupported provider combination: {0}")]
    Unsupported(String),
    /// The cancellation token fired during traversal.
    #[error("Planning was cancelled")]
    Cancelled,
    /// Maximum traversal depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
}

/// Result type for planning operations.
///
/// ```rust
/// use ferrous_inject::{PlanError, PlanResult};
///
/// fn failing() -> PlanResult<()> {
///     Err(PlanError::Cancelled)
/// }
///
/// assert!(failing().is_err());
/// ```
pub type PlanResult<T> = Result<T, PlanError>;

/// Invalid planner configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[cfg(feature = "config")]
    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returned by runtime support types once their container has been disposed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot access a disposed container: {container}")]
pub struct ObjectDisposedError {
    /// Name of the disposed container
    pub container: &'static str,
}
