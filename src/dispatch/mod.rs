//! Event dispatch: events, player actions, handler contexts, and the
//! breadth-first evaluation engine.

pub mod action;
pub mod context;
pub mod engine;
pub mod event;

pub use action::PlayerAction;
pub use context::{ActionContext, GuardContext};
pub use engine::{DispatchLog, Dispatcher};
pub use event::{Event, EventKind, EventScope};
