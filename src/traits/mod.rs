//! Traits generated container code calls on user types.

mod dispose;
mod factory;
mod initialize;

pub use dispose::{AsyncDispose, Dispose};
pub use factory::{AsyncFactory, Factory};
pub use initialize::{RequiresAsyncInitialization, RequiresInitialization};
