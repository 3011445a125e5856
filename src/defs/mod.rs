//! Immutable rule data: definitions, handlers, the authoring builder,
//! and the versioned registry.

pub mod builder;
pub mod definition;
pub mod handler;
pub mod registry;

pub use builder::DefinitionBuilder;
pub use definition::{CardMeta, EntityInfo, EntityKind};
pub use handler::{EffectFn, GuardFn, HandlerEntry};
pub use registry::RuleRegistry;
