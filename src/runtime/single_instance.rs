//! Lazily created container-wide values.

use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::ObjectDisposedError;

use super::DisposeAction;

/// Disposed flag shared by a container and its single instances.
///
/// Disposal is idempotent: only the first [`begin`](Self::begin) wins.
#[derive(Debug)]
pub struct ContainerDisposal {
    name: &'static str,
    disposed: AtomicBool,
}

impl ContainerDisposal {
    pub fn new(name: &'static str) -> Self {
        Self { name, disposed: AtomicBool::new(false) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Marks the container disposed. Returns false if it already was.
    pub fn begin(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }

    pub fn throw_if_disposed(&self) -> Result<(), ObjectDisposedError> {
        if self.is_disposed() {
            Err(ObjectDisposedError { container: self.name })
        } else {
            Ok(())
        }
    }
}

/// A single-instance field with its construction lock and dispose action.
///
/// The first caller constructs the value under the lock; everyone else gets
/// the stored value. Construction is refused once the container is disposed.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use ferrous_inject::runtime::{ContainerDisposal, SingleInstance};
///
/// let disposal = ContainerDisposal::new("AppContainer");
/// let pool = SingleInstance::new();
/// let created = AtomicUsize::new(0);
///
/// for _ in 0..3 {
///     let value = pool
///         .get_or_create(&disposal, || {
///             created.fetch_add(1, Ordering::SeqCst);
///             ("pool".to_string(), None)
///         })
///         .unwrap();
///     assert_eq!(value, "pool");
/// }
/// assert_eq!(created.load(Ordering::SeqCst), 1);
/// ```
#[derive(Debug)]
pub struct SingleInstance<T> {
    value: OnceCell<T>,
    lock: Mutex<()>,
    dispose_action: Mutex<Option<DisposeAction>>,
}

impl<T> Default for SingleInstance<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SingleInstance<T> {
    pub fn new() -> Self {
        Self { value: OnceCell::new(), lock: Mutex::new(()), dispose_action: Mutex::new(None) }
    }

    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn get_or_create<F>(&self, disposal: &ContainerDisposal, create: F) -> Result<&T, ObjectDisposedError>
    where
        F: FnOnce() -> (T, Option<DisposeAction>),
    {
        disposal.throw_if_disposed()?;
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let _guard = self.lock.lock();
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        disposal.throw_if_disposed()?;
        let (value, dispose_action) = create();
        *self.dispose_action.lock() = dispose_action;
        Ok(self.value.get_or_init(|| value))
    }

    /// Takes the dispose action, leaving none behind.
    pub fn take_dispose_action(&self) -> Option<DisposeAction> {
        let _guard = self.lock.lock();
        self.dispose_action.lock().take()
    }
}

/// [`SingleInstance`] whose construction awaits.
///
/// The construction lock is a `tokio` mutex held across the await, so
/// concurrent callers wait for the first construction instead of starting
/// their own.
///
/// # Examples
///
/// ```
/// use ferrous_inject::runtime::{AsyncSingleInstance, ContainerDisposal};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let disposal = ContainerDisposal::new("AppContainer");
/// let client = AsyncSingleInstance::new();
/// let value = client.get_or_create(&disposal, || async { (7u32, None) }).await.unwrap();
/// assert_eq!(*value, 7);
/// # }
/// ```
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct AsyncSingleInstance<T> {
    value: OnceCell<T>,
    lock: tokio::sync::Mutex<()>,
    dispose_action: Mutex<Option<DisposeAction>>,
}

#[cfg(feature = "async")]
impl<T> Default for AsyncSingleInstance<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "async")]
impl<T> AsyncSingleInstance<T> {
    pub fn new() -> Self {
        Self { value: OnceCell::new(), lock: tokio::sync::Mutex::new(()), dispose_action: Mutex::new(None) }
    }

    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    pub async fn get_or_create<F, Fut>(&self, disposal: &ContainerDisposal, create: F) -> Result<&T, ObjectDisposedError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = (T, Option<DisposeAction>)>,
    {
        disposal.throw_if_disposed()?;
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let _guard = self.lock.lock().await;
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        disposal.throw_if_disposed()?;
        let (value, dispose_action) = create().await;
        *self.dispose_action.lock() = dispose_action;
        Ok(self.value.get_or_init(|| value))
    }

    pub async fn take_dispose_action(&self) -> Option<DisposeAction> {
        let _guard = self.lock.lock().await;
        self.dispose_action.lock().take()
    }
}
