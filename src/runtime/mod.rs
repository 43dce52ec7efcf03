//! Support types called by generated container code.
//!
//! The planner itself never touches these; they are what a rendered plan
//! compiles against. Single-instance fields use check-lock-check lazy
//! initialization, delegates collect their disposals in [`DisposeActions`],
//! and owned scopes hand out [`Owned`] values the caller releases.

mod dispose_actions;
mod owned;
mod single_instance;

pub use dispose_actions::{BoxFutureUnit, DisposeAction, DisposeActions};
pub use owned::{AsyncOwned, Owned};
#[cfg(feature = "async")]
pub use single_instance::AsyncSingleInstance;
pub use single_instance::{ContainerDisposal, SingleInstance};
