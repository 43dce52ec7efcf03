//! Values whose disposal is the caller's responsibility.

use std::ops::Deref;

use parking_lot::Mutex;

use super::{BoxFutureUnit, DisposeActions};
use crate::traits::{AsyncDispose, Dispose};

/// A value plus the one-shot hook that releases it and everything created
/// for it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use ferrous_inject::runtime::Owned;
/// use ferrous_inject::Dispose;
///
/// let released = Arc::new(AtomicBool::new(false));
/// let flag = released.clone();
/// let session = Owned::new("session-1".to_string(), move || flag.store(true, Ordering::SeqCst));
///
/// assert_eq!(session.len(), 9);
/// session.dispose();
/// session.dispose();
/// assert!(released.load(Ordering::SeqCst));
/// ```
pub struct Owned<T> {
    value: T,
    dispose: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl<T> Owned<T> {
    pub fn new<F>(value: T, dispose: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self { value, dispose: Mutex::new(Some(Box::new(dispose))) }
    }

    /// Wraps a value with the registry its dependencies were pushed onto.
    pub fn with_actions(value: T, actions: DisposeActions) -> Self {
        Self::new(value, move || actions.drain())
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn is_disposed(&self) -> bool {
        self.dispose.lock().is_none()
    }
}

impl<T> Deref for Owned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Send + Sync + 'static> Dispose for Owned<T> {
    fn dispose(&self) {
        let dispose = self.dispose.lock().take();
        if let Some(dispose) = dispose {
            dispose();
        }
    }
}

/// [`Owned`] released asynchronously.
pub struct AsyncOwned<T> {
    value: T,
    dispose: Mutex<Option<Box<dyn FnOnce() -> BoxFutureUnit + Send>>>,
}

impl<T> AsyncOwned<T> {
    pub fn new<Fut, F>(value: T, dispose: F) -> Self
    where
        Fut: std::future::Future<Output = ()> + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
    {
        Self { value, dispose: Mutex::new(Some(Box::new(move || Box::pin(dispose())))) }
    }

    pub fn with_actions(value: T, actions: DisposeActions) -> Self {
        Self::new(value, move || async move { actions.drain_async().await })
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn is_disposed(&self) -> bool {
        self.dispose.lock().is_none()
    }
}

impl<T> Deref for AsyncOwned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

#[async_trait::async_trait]
impl<T: Send + Sync + 'static> AsyncDispose for AsyncOwned<T> {
    async fn dispose(&self) {
        let dispose = self.dispose.lock().take();
        if let Some(dispose) = dispose {
            dispose().await;
        }
    }
}
