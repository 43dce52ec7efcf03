//! Post-construction hooks.

/// Runs once, right after construction and before the value is handed to
/// anything that depends on it.
pub trait RequiresInitialization {
    fn initialize(&mut self);
}

/// Asynchronous [`RequiresInitialization`]. Resolving a provider with this
/// hook is only possible from an asynchronous root.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use ferrous_inject::RequiresAsyncInitialization;
///
/// struct Migrations {
///     applied: usize,
/// }
///
/// #[async_trait]
/// impl RequiresAsyncInitialization for Migrations {
///     async fn initialize_async(&mut self) {
///         self.applied = 3;
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait RequiresAsyncInitialization: Send {
    async fn initialize_async(&mut self);
}
