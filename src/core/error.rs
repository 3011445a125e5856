//! Error types for the rule engine.

use std::fmt;

use super::id::DefinitionId;
use super::version::GameVersion;

/// Errors surfaced by registry construction, entity creation, and
/// dispatch.
///
/// Exhausted usage counters are *not* errors: an exhausted handler is
/// silently skipped during dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The definition id was never registered under any version.
    UnknownDefinition(DefinitionId),
    /// The definition id exists, but no range contains the requested
    /// version.
    DefinitionNotAvailable {
        /// The requested definition.
        id: DefinitionId,
        /// The version that failed to resolve.
        version: GameVersion,
    },
    /// Two registered definitions for the same id have overlapping
    /// version ranges. Fatal at load time.
    OverlappingVersionRange(DefinitionId),
    /// A state mutation that violates battle invariants: disposing an
    /// already-disposed entity, attaching to a missing master, a guard
    /// predicate failing, and similar. Aborts the current dispatch;
    /// mutations applied before the error are retained.
    InvalidMutation(String),
}

impl EngineError {
    /// Build an `InvalidMutation` from any displayable reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidMutation(reason.into())
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnknownDefinition(id) => {
                write!(f, "no definition registered for {id}")
            }
            EngineError::DefinitionNotAvailable { id, version } => {
                write!(f, "{id} has no definition active at {version}")
            }
            EngineError::OverlappingVersionRange(id) => {
                write!(f, "overlapping version ranges registered for {id}")
            }
            EngineError::InvalidMutation(reason) => {
                write!(f, "invalid mutation: {reason}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
