//! User-written factories.

/// Creates instances of `T` on behalf of the container.
///
/// Values a factory created are never disposed directly: the container hands
/// each one back through [`release`](Factory::release) at teardown.
pub trait Factory<T>: Send + Sync {
    fn create(&self) -> T;

    /// Returns an instance the factory created. Dropping it is the default.
    fn release(&self, instance: T) {
        drop(instance);
    }
}

/// [`Factory`] whose creation and release suspend.
#[async_trait::async_trait]
pub trait AsyncFactory<T: Send + 'static>: Send + Sync {
    async fn create(&self) -> T;

    async fn release(&self, instance: T) {
        drop(instance);
    }
}
