//! The compiled rule registry.
//!
//! Registration is a one-time, append-only compilation step. The
//! registry maps each definition id to the set of version-ranged
//! `EntityInfo`s registered for it; the ranges must partition, so
//! `resolve` always finds at most one match for a concrete version.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::{DefinitionId, EngineError, EngineResult, GameVersion};
use crate::dispatch::EventKind;

use super::definition::{CardMeta, EntityInfo};
use super::handler::HandlerEntry;

/// Immutable-after-load table of rule definitions.
///
/// ## Versioned resolution
///
/// Several definitions may be registered for the same id with disjoint
/// `[since, until)` ranges; `resolve` picks the single one active at
/// the requested version. Overlapping ranges for one id are rejected
/// at registration time - a load-time contract violation, not a
/// runtime condition.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    defs: FxHashMap<DefinitionId, Vec<Arc<EntityInfo>>>,
}

impl RuleRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compiled definition.
    ///
    /// Fails with `OverlappingVersionRange` if another definition for
    /// the same id is active in any shared version.
    pub fn register(&mut self, info: EntityInfo) -> EngineResult<()> {
        let entries = self.defs.entry(info.id).or_default();
        if entries.iter().any(|e| e.range.overlaps(&info.range)) {
            return Err(EngineError::OverlappingVersionRange(info.id));
        }
        entries.push(Arc::new(info));
        Ok(())
    }

    /// Resolve the single definition active for `id` at `version`.
    ///
    /// `UnknownDefinition` if the id was never registered,
    /// `DefinitionNotAvailable` if no range contains the version.
    pub fn resolve(&self, id: DefinitionId, version: GameVersion) -> EngineResult<&Arc<EntityInfo>> {
        let entries = self
            .defs
            .get(&id)
            .ok_or(EngineError::UnknownDefinition(id))?;
        entries
            .iter()
            .find(|e| e.range.contains(version))
            .ok_or(EngineError::DefinitionNotAvailable { id, version })
    }

    /// The ordered handlers of one definition for one event, resolved
    /// at a version.
    pub fn handlers(
        &self,
        id: DefinitionId,
        version: GameVersion,
        event: EventKind,
    ) -> EngineResult<impl Iterator<Item = &HandlerEntry>> {
        Ok(self.resolve(id, version)?.handlers_for(event))
    }

    /// Check if any definition exists for the id, in any version.
    #[must_use]
    pub fn contains(&self, id: DefinitionId) -> bool {
        self.defs.contains_key(&id)
    }

    /// Number of distinct definition ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Iterate every registered definition across all versions.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntityInfo>> {
        self.defs.values().flatten()
    }

    /// Build the versioned display-metadata snapshot for the asset
    /// layer: every id active at `version`, with its name and
    /// description. Keyword entries (negative ids) are skipped.
    #[must_use]
    pub fn metadata_table(&self, version: GameVersion) -> FxHashMap<DefinitionId, CardMeta> {
        self.defs
            .iter()
            .filter(|(id, _)| !id.is_keyword())
            .filter_map(|(id, entries)| {
                entries.iter().find(|e| e.range.contains(version)).map(|e| {
                    (
                        *id,
                        CardMeta {
                            name: e.name.clone(),
                            description: e.description.clone(),
                        },
                    )
                })
            })
            .collect()
    }
}
