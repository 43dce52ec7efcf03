//! Release hooks attached to disposable providers.

/// Synchronous teardown.
///
/// A plan attaches a dispose call to every operation creating a value whose
/// provider was declared disposable. Values are released in the reverse of
/// their creation order.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use ferrous_inject::Dispose;
///
/// struct Cache {
///     flushed: AtomicBool,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         self.flushed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let cache = Cache { flushed: AtomicBool::new(false) };
/// cache.dispose();
/// assert!(cache.flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    fn dispose(&self);
}

/// Asynchronous teardown.
///
/// Types implementing both flavours are released asynchronously when the
/// enclosing container or async owned scope disposes asynchronously.
///
/// ```
/// use std::sync::Mutex;
/// use async_trait::async_trait;
/// use ferrous_inject::AsyncDispose;
///
/// struct Outbox {
///     pending: Mutex<Vec<String>>,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for Outbox {
///     async fn dispose(&self) {
///         tokio::task::yield_now().await;
///         self.pending.lock().unwrap().clear();
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let outbox = Outbox { pending: Mutex::new(vec!["welcome-mail".to_string()]) };
/// outbox.dispose().await;
/// assert!(outbox.pending.lock().unwrap().is_empty());
/// # }
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    async fn dispose(&self);
}
