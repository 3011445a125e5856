//! Game versions and definition version ranges.
//!
//! Card rules change across game versions. Every definition carries a
//! half-open `[since, until)` range; for one definition id the ranges
//! must partition, so exactly one definition is active for any resolved
//! version.

use serde::{Deserialize, Serialize};

/// A game data version, ordered like a semantic version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameVersion {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Patch version.
    pub patch: u8,
}

impl GameVersion {
    /// Create a new version.
    #[must_use]
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self { major, minor, patch }
    }
}

impl std::fmt::Display for GameVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Half-open version range `[since, until)`.
///
/// `None` on either bound means unbounded on that side. `until` is
/// exclusive: a definition with `until = v4.2.0` is no longer active at
/// v4.2.0 itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VersionRange {
    /// First version (inclusive) at which the definition is active.
    pub since: Option<GameVersion>,
    /// First version (exclusive) at which the definition stops applying.
    pub until: Option<GameVersion>,
}

impl VersionRange {
    /// The unbounded range, active in every version.
    #[must_use]
    pub const fn any() -> Self {
        Self { since: None, until: None }
    }

    /// Active from `since` onwards.
    #[must_use]
    pub const fn from(since: GameVersion) -> Self {
        Self { since: Some(since), until: None }
    }

    /// Active in `[since, until)`.
    #[must_use]
    pub const fn between(since: GameVersion, until: GameVersion) -> Self {
        Self { since: Some(since), until: Some(until) }
    }

    /// Active before `until`.
    #[must_use]
    pub const fn up_to(until: GameVersion) -> Self {
        Self { since: None, until: Some(until) }
    }

    /// A range that contains no version at all (`since >= until`).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match (self.since, self.until) {
            (Some(since), Some(until)) => since >= until,
            _ => false,
        }
    }

    /// Check whether a version falls inside this range.
    #[must_use]
    pub fn contains(&self, version: GameVersion) -> bool {
        if let Some(since) = self.since {
            if version < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if version >= until {
                return false;
            }
        }
        true
    }

    /// Check whether two ranges share at least one version.
    ///
    /// Used at load time to reject competing definitions whose ranges
    /// do not partition.
    #[must_use]
    pub fn overlaps(&self, other: &VersionRange) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let starts_before_other_ends = match (self.since, other.until) {
            (Some(since), Some(until)) => since < until,
            _ => true,
        };
        let other_starts_before_self_ends = match (other.since, self.until) {
            (Some(since), Some(until)) => since < until,
            _ => true,
        };
        starts_before_other_ends && other_starts_before_self_ends
    }
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.since, self.until) {
            (Some(s), Some(u)) => write!(f, "[{s}, {u})"),
            (Some(s), None) => write!(f, "[{s}, ..)"),
            (None, Some(u)) => write!(f, "[.., {u})"),
            (None, None) => write!(f, "[.., ..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V3_3: GameVersion = GameVersion::new(3, 3, 0);
    const V4_0: GameVersion = GameVersion::new(4, 0, 0);
    const V4_2: GameVersion = GameVersion::new(4, 2, 0);

    #[test]
    fn test_version_ordering() {
        assert!(V3_3 < V4_0);
        assert!(V4_0 < V4_2);
        assert!(GameVersion::new(4, 0, 1) > V4_0);
    }

    #[test]
    fn test_contains_until_exclusive() {
        let range = VersionRange::between(V3_3, V4_2);
        assert!(range.contains(V3_3));
        assert!(range.contains(V4_0));
        assert!(!range.contains(V4_2)); // until is exclusive
    }

    #[test]
    fn test_contains_unbounded() {
        assert!(VersionRange::any().contains(V3_3));
        assert!(VersionRange::from(V4_0).contains(V4_2));
        assert!(!VersionRange::from(V4_0).contains(V3_3));
        assert!(VersionRange::up_to(V4_0).contains(V3_3));
        assert!(!VersionRange::up_to(V4_0).contains(V4_0));
    }

    #[test]
    fn test_overlap_adjacent_ranges() {
        // [3.3, 4.0) and [4.0, ..) partition cleanly
        let old = VersionRange::between(V3_3, V4_0);
        let new = VersionRange::from(V4_0);
        assert!(!old.overlaps(&new));
        assert!(!new.overlaps(&old));
    }

    #[test]
    fn test_overlap_detected() {
        let a = VersionRange::between(V3_3, V4_2);
        let b = VersionRange::from(V4_0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        // Unbounded overlaps everything
        assert!(VersionRange::any().overlaps(&a));
        assert!(a.overlaps(&VersionRange::any()));
    }

    #[test]
    fn test_empty_range_overlaps_nothing() {
        let empty = VersionRange::between(V4_0, V4_0);
        assert!(empty.is_empty());
        assert!(!empty.contains(V4_0));

        // Containing no version, it cannot collide with anything.
        assert!(!empty.overlaps(&VersionRange::any()));
        assert!(!VersionRange::any().overlaps(&empty));
        assert!(!empty.overlaps(&VersionRange::between(V3_3, V4_2)));
        assert!(!empty.overlaps(&empty));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", VersionRange::between(V3_3, V4_0)), "[v3.3.0, v4.0.0)");
        assert_eq!(format!("{}", VersionRange::any()), "[.., ..)");
    }
}
