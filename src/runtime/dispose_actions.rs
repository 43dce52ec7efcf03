//! Deferred disposal hooks.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use parking_lot::Mutex;
use tracing::warn;

/// Future returned by asynchronous disposal hooks.
pub type BoxFutureUnit = Pin<Box<dyn Future<Output = ()> + Send>>;

/// One disposal hook, run at most once.
pub enum DisposeAction {
    Sync(Box<dyn FnOnce() + Send>),
    Async(Box<dyn FnOnce() -> BoxFutureUnit + Send>),
}

impl DisposeAction {
    pub fn sync<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        DisposeAction::Sync(Box::new(f))
    }

    pub fn asynchronous<Fut, F>(f: F) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
    {
        DisposeAction::Async(Box::new(move || Box::pin(f())))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, DisposeAction::Async(_))
    }

    /// Runs a synchronous hook. Asynchronous hooks are handed back unrun.
    pub fn run_sync(self) -> Option<Self> {
        match self {
            DisposeAction::Sync(f) => {
                f();
                None
            }
            pending @ DisposeAction::Async(_) => Some(pending),
        }
    }

    pub async fn run(self) {
        match self {
            DisposeAction::Sync(f) => f(),
            DisposeAction::Async(f) => f().await,
        }
    }
}

impl fmt::Debug for DisposeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_async() { "DisposeAction::Async" } else { "DisposeAction::Sync" })
    }
}

/// Registry a delegate pushes the disposals of the values it creates onto.
///
/// Draining runs the hooks in LIFO order, so values are released in the
/// reverse of the order they were created in.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use ferrous_inject::runtime::{DisposeAction, DisposeActions};
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let actions = DisposeActions::new();
/// for name in ["first", "second"] {
///     let log = log.clone();
///     actions.push(DisposeAction::sync(move || log.lock().unwrap().push(name)));
/// }
///
/// actions.drain();
/// assert_eq!(*log.lock().unwrap(), ["second", "first"]);
/// assert!(actions.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct DisposeActions {
    actions: Mutex<Vec<DisposeAction>>,
}

impl DisposeActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, action: DisposeAction) {
        self.actions.lock().push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.lock().is_empty()
    }

    /// Runs every synchronous hook in reverse order.
    ///
    /// Asynchronous hooks cannot run here; they are dropped with a warning.
    pub fn drain(&self) {
        let actions = std::mem::take(&mut *self.actions.lock());
        for action in actions.into_iter().rev() {
            if action.run_sync().is_some() {
                warn!("Asynchronous dispose action dropped by synchronous drain");
            }
        }
    }

    /// Runs every hook in reverse order, awaiting asynchronous ones.
    pub async fn drain_async(&self) {
        let actions = std::mem::take(&mut *self.actions.lock());
        for action in actions.into_iter().rev() {
            action.run().await;
        }
    }
}
