//! Cooperative cancellation for planning passes.
//!
//! Every recursive descent of a graph walk checks the token; once it fires the
//! walk aborts with [`PlanError::Cancelled`] and no partial plan is returned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{PlanError, PlanResult};

/// Cancellation signal for a generation run or one container within it.
///
/// Clones share state. A token observes its own flag plus the flags of every
/// token it was derived from, so cancelling a run cancels all of its
/// containers while cancelling one container leaves the run alone.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{CancellationToken, PlanError};
///
/// let run = CancellationToken::new();
/// let container = run.child_token();
///
/// assert!(container.throw_if_cancelled().is_ok());
/// run.cancel();
/// assert_eq!(container.throw_if_cancelled(), Err(PlanError::Cancelled));
/// ```
#[derive(Clone, Debug)]
pub struct CancellationToken {
    /// Ancestors' flags first, own flag last
    flags: SmallVec<[Arc<AtomicBool>; 2]>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let mut flags = SmallVec::new();
        flags.push(Arc::new(AtomicBool::new(false)));
        Self { flags }
    }

    /// Derives a token that also fires when `self` (or any ancestor) fires.
    pub fn child_token(&self) -> Self {
        let mut flags = self.flags.clone();
        flags.push(Arc::new(AtomicBool::new(false)));
        Self { flags }
    }

    pub fn cancel(&self) {
        if let Some(own) = self.flags.last() {
            own.store(true, Ordering::Release);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags.iter().any(|flag| flag.load(Ordering::Acquire))
    }

    /// Returns [`PlanError::Cancelled`] once the token has fired.
    pub fn throw_if_cancelled(&self) -> PlanResult<()> {
        if self.is_cancelled() {
            return Err(PlanError::Cancelled);
        }
        Ok(())
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_is_live() {
        let token = CancellationToken::default();
        assert!(!token.is_cancelled());
        assert!(token.throw_if_cancelled().is_ok());
    }

    #[test]
    fn test_child_does_not_cancel_parent() {
        let run = CancellationToken::new();
        let first = run.child_token();
        let second = run.child_token();

        first.cancel();
        assert!(first.is_cancelled());
        assert!(!run.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn test_grandchild_sees_root_cancellation() {
        let run = CancellationToken::new();
        let nested = run.child_token().child_token();
        let shared = nested.clone();

        run.cancel();
        assert_eq!(shared.throw_if_cancelled(), Err(PlanError::Cancelled));
    }
}
