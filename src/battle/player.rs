//! Per-side battle state.
//!
//! Each side holds its roster of characters in seat order (with the
//! attachment list of each character in registration order), the
//! side-wide combat statuses, summon and support collections, and the
//! shared counters (dice, hand size, declared end).

use smallvec::SmallVec;

use crate::core::EntityId;

/// One character's seat: the character entity plus its attachments
/// (equipment, statuses, skills) in the order they were attached.
#[derive(Clone, Debug)]
pub struct CharacterSlot {
    /// The character entity.
    pub character: EntityId,
    /// Attached entity ids, registration order.
    pub attachments: SmallVec<[EntityId; 4]>,
}

impl CharacterSlot {
    /// Create a slot for a character with no attachments.
    #[must_use]
    pub fn new(character: EntityId) -> Self {
        Self {
            character,
            attachments: SmallVec::new(),
        }
    }
}

/// The state owned by one side of the battle.
#[derive(Clone, Debug, Default)]
pub struct PlayerSide {
    /// Characters in seat order.
    pub characters: Vec<CharacterSlot>,
    /// The currently active character, if any.
    pub active: Option<EntityId>,
    /// Side-wide combat statuses, registration order.
    pub combat_statuses: Vec<EntityId>,
    /// Summons, registration order.
    pub summons: Vec<EntityId>,
    /// Supports, registration order.
    pub supports: Vec<EntityId>,
    /// Available dice.
    pub dice: u8,
    /// Cards in hand. Deck contents are the driver's concern; the
    /// engine tracks the count only.
    pub hand_size: u8,
    /// Whether this side has declared the end of its round.
    pub declared_end: bool,
}

impl PlayerSide {
    /// Find the slot of a character.
    #[must_use]
    pub fn slot(&self, character: EntityId) -> Option<&CharacterSlot> {
        self.characters.iter().find(|s| s.character == character)
    }

    /// Find the mutable slot of a character.
    pub fn slot_mut(&mut self, character: EntityId) -> Option<&mut CharacterSlot> {
        self.characters.iter_mut().find(|s| s.character == character)
    }

    /// Remove an entity id from whichever collection holds it.
    pub fn remove(&mut self, id: EntityId) {
        self.combat_statuses.retain(|&e| e != id);
        self.summons.retain(|&e| e != id);
        self.supports.retain(|&e| e != id);
        for slot in &mut self.characters {
            slot.attachments.retain(|e| *e != id);
        }
        if let Some(pos) = self.characters.iter().position(|s| s.character == id) {
            self.characters.remove(pos);
        }
        if self.active == Some(id) {
            self.active = None;
        }
    }

    /// All entity ids on this side in battle order: characters in seat
    /// order each followed by its attachments, then combat statuses,
    /// summons, and supports.
    pub fn ordered_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.characters
            .iter()
            .flat_map(|s| std::iter::once(s.character).chain(s.attachments.iter().copied()))
            .chain(self.combat_statuses.iter().copied())
            .chain(self.summons.iter().copied())
            .chain(self.supports.iter().copied())
    }
}
