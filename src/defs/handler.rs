//! Event handler entries.
//!
//! A handler is an (event, optional guard, effect) triple bound to a
//! definition. Handlers are compiled into the immutable handler table
//! at registry load and shared by every live instance of the
//! definition.

use std::fmt;
use std::sync::Arc;

use crate::core::EngineResult;
use crate::dispatch::{ActionContext, EventKind, GuardContext};

/// Guard predicate evaluated against an immutable view of the event
/// and state. A guard that returns `Err` aborts the dispatch as an
/// `InvalidMutation`.
pub type GuardFn = dyn Fn(&GuardContext<'_>) -> EngineResult<bool> + Send + Sync;

/// Effect function invoked through the mutable action context.
pub type EffectFn = dyn Fn(&mut ActionContext<'_>) -> EngineResult<()> + Send + Sync;

/// One registered handler: event name, optional guard, effect.
///
/// Order of entries within a definition follows registration order and
/// decides tie-breaks when several handlers of the same card fire on
/// the same event.
#[derive(Clone)]
pub struct HandlerEntry {
    /// The event this handler listens for.
    pub event: EventKind,
    /// Optional guard; the handler is skipped when it returns false.
    pub guard: Option<Arc<GuardFn>>,
    /// The effect to run.
    pub effect: Arc<EffectFn>,
}

impl HandlerEntry {
    /// Create an unguarded handler.
    pub fn new(event: EventKind, effect: Arc<EffectFn>) -> Self {
        Self { event, guard: None, effect }
    }

    /// Create a guarded handler.
    pub fn guarded(event: EventKind, guard: Arc<GuardFn>, effect: Arc<EffectFn>) -> Self {
        Self { event, guard: Some(guard), effect }
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("event", &self.event)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}
