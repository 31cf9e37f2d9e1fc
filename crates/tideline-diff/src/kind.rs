//! The synchronization classification of one item.
//!
//! A [`SyncKind`] has three independent parts: what kind of change happened
//! ([`ChangeType`]), which side it happened on ([`Direction`]), and, for
//! conflicts only, what kind of conflict it is ([`ConflictFlags`]).
//!
//! The historical integer encoding is kept for interchange:
//!
//! | bits | meaning |
//! |---|---|
//! | `0..=3` | change type (`IN_SYNC=0`, `ADDITION=1`, `DELETION=2`, `CHANGE=3`) |
//! | `4`, `8` | direction (`OUTGOING=4`, `INCOMING=8`, `CONFLICTING=12`) |
//! | `16`, `32`, `64` | `PSEUDO_CONFLICT`, `AUTOMERGE_CONFLICT`, `MANUAL_CONFLICT` |

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::error::DiffError;

const CHANGE_MASK: u32 = 0b11;
const DIRECTION_MASK: u32 = 0b1100;
const CONFLICT_MASK: u32 = 0b111_0000;

/// What kind of change separates the sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    InSync,
    Addition,
    Deletion,
    Change,
}

impl ChangeType {
    pub fn bits(self) -> u32 {
        match self {
            Self::InSync => 0,
            Self::Addition => 1,
            Self::Deletion => 2,
            Self::Change => 3,
        }
    }

    fn from_bits(bits: u32) -> Self {
        match bits & CHANGE_MASK {
            1 => Self::Addition,
            2 => Self::Deletion,
            3 => Self::Change,
            _ => Self::InSync,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::InSync => "in-sync",
            Self::Addition => "addition",
            Self::Deletion => "deletion",
            Self::Change => "change",
        }
    }
}

/// Which side a change is on, relative to the local copy.
///
/// Directions combine with `|`: `Outgoing | Incoming == Conflicting`, `None`
/// is the identity and `Conflicting` absorbs everything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// No direction: in sync, or a two-way comparison.
    #[default]
    None,
    /// Only the local side changed.
    Outgoing,
    /// Only the remote side changed.
    Incoming,
    /// Both sides changed.
    Conflicting,
}

impl Direction {
    pub fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Outgoing => 4,
            Self::Incoming => 8,
            Self::Conflicting => 12,
        }
    }

    fn from_bits(bits: u32) -> Self {
        match bits & DIRECTION_MASK {
            4 => Self::Outgoing,
            8 => Self::Incoming,
            12 => Self::Conflicting,
            _ => Self::None,
        }
    }

    /// `true` for `Outgoing` and `Conflicting`.
    pub fn includes_outgoing(self) -> bool {
        self.bits() & Self::Outgoing.bits() != 0
    }

    /// `true` for `Incoming` and `Conflicting`.
    pub fn includes_incoming(self) -> bool {
        self.bits() & Self::Incoming.bits() != 0
    }

    fn label(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Outgoing => Some("outgoing"),
            Self::Incoming => Some("incoming"),
            Self::Conflicting => Some("conflicting"),
        }
    }
}

impl BitOr for Direction {
    type Output = Direction;

    fn bitor(self, rhs: Direction) -> Direction {
        Direction::from_bits(self.bits() | rhs.bits())
    }
}

impl BitOrAssign for Direction {
    fn bitor_assign(&mut self, rhs: Direction) {
        *self = *self | rhs;
    }
}

/// Conflict subtype flags. Independent of each other.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ConflictFlags(u8);

impl ConflictFlags {
    /// Both sides changed but ended at the same content.
    pub const PSEUDO_CONFLICT: Self = Self(16);
    /// The content merger can reconcile the sides unaided.
    pub const AUTOMERGE_CONFLICT: Self = Self(32);
    /// The content merger cannot reconcile the sides.
    pub const MANUAL_CONFLICT: Self = Self(64);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn bits(self) -> u32 {
        u32::from(self.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Display names of the set flags, in label order.
    pub fn names(self) -> Vec<&'static str> {
        [
            (Self::MANUAL_CONFLICT, "manual"),
            (Self::AUTOMERGE_CONFLICT, "auto"),
            (Self::PSEUDO_CONFLICT, "pseudo"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect()
    }
}

impl BitOr for ConflictFlags {
    type Output = ConflictFlags;

    fn bitor(mut self, rhs: ConflictFlags) -> ConflictFlags {
        self.insert(rhs);
        self
    }
}

impl fmt::Debug for ConflictFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConflictFlags({})", self.names().join("|"))
    }
}

/// The classification of one item.
///
/// Invariants, enforced by construction: an in-sync kind has no direction,
/// and conflict flags are only kept when the direction is `Conflicting`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SyncKind {
    change: ChangeType,
    direction: Direction,
    conflict: ConflictFlags,
}

impl SyncKind {
    pub const IN_SYNC: Self = Self {
        change: ChangeType::InSync,
        direction: Direction::None,
        conflict: ConflictFlags::empty(),
    };

    pub fn new(change: ChangeType, direction: Direction) -> Self {
        let direction = if change == ChangeType::InSync {
            Direction::None
        } else {
            direction
        };
        Self {
            change,
            direction,
            conflict: ConflictFlags::empty(),
        }
    }

    /// A two-way kind (no direction).
    pub fn two_way(change: ChangeType) -> Self {
        Self::new(change, Direction::None)
    }

    /// Add a conflict flag. Ignored unless the direction is `Conflicting`.
    pub fn with_conflict(mut self, flag: ConflictFlags) -> Self {
        if self.direction == Direction::Conflicting {
            self.conflict.insert(flag);
        }
        self
    }

    pub fn change(&self) -> ChangeType {
        self.change
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn conflict(&self) -> ConflictFlags {
        self.conflict
    }

    pub fn is_in_sync(&self) -> bool {
        self.change == ChangeType::InSync
    }

    pub fn is_conflicting(&self) -> bool {
        self.direction == Direction::Conflicting
    }

    pub fn has_conflict(&self, flag: ConflictFlags) -> bool {
        self.conflict.contains(flag)
    }

    /// The historical integer encoding.
    pub fn bits(&self) -> u32 {
        self.change.bits() | self.direction.bits() | self.conflict.bits()
    }

    /// Decode the integer encoding, rejecting unknown bits and combinations
    /// that break the invariants.
    pub fn from_bits(bits: u32) -> Result<Self, DiffError> {
        if bits & !(CHANGE_MASK | DIRECTION_MASK | CONFLICT_MASK) != 0 {
            return Err(DiffError::InvalidKindBits(bits));
        }
        let change = ChangeType::from_bits(bits);
        let direction = Direction::from_bits(bits);
        let conflict = bits & CONFLICT_MASK;

        if change == ChangeType::InSync && bits != 0 {
            return Err(DiffError::InvalidKindBits(bits));
        }
        if conflict != 0 && direction != Direction::Conflicting {
            return Err(DiffError::InvalidKindBits(bits));
        }

        Ok(Self {
            change,
            direction,
            conflict: ConflictFlags(conflict as u8),
        })
    }
}

impl Default for SyncKind {
    fn default() -> Self {
        Self::IN_SYNC
    }
}

impl TryFrom<u32> for SyncKind {
    type Error = DiffError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        Self::from_bits(bits)
    }
}

impl From<SyncKind> for u32 {
    fn from(kind: SyncKind) -> Self {
        kind.bits()
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_in_sync() {
            return f.write_str(ChangeType::InSync.label());
        }
        if let Some(direction) = self.direction.label() {
            write!(f, "{direction} ")?;
        }
        f.write_str(self.change.label())?;
        for name in self.conflict.names() {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

impl fmt::Debug for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyncKind({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_lattice() {
        use Direction::*;
        assert_eq!(Outgoing | Incoming, Conflicting);
        assert_eq!(None | Incoming, Incoming);
        assert_eq!(Outgoing | None, Outgoing);
        assert_eq!(Conflicting | Outgoing, Conflicting);
        let mut d = None;
        d |= Outgoing;
        d |= Incoming;
        assert_eq!(d, Conflicting);
    }

    #[test]
    fn flags_ignored_unless_conflicting() {
        let outgoing = SyncKind::new(ChangeType::Change, Direction::Outgoing)
            .with_conflict(ConflictFlags::MANUAL_CONFLICT);
        assert!(outgoing.conflict().is_empty());

        let conflicting = SyncKind::new(ChangeType::Change, Direction::Conflicting)
            .with_conflict(ConflictFlags::MANUAL_CONFLICT);
        assert!(conflicting.has_conflict(ConflictFlags::MANUAL_CONFLICT));
    }

    #[test]
    fn in_sync_drops_direction() {
        let kind = SyncKind::new(ChangeType::InSync, Direction::Conflicting);
        assert_eq!(kind, SyncKind::IN_SYNC);
        assert_eq!(kind.bits(), 0);
    }

    #[test]
    fn historical_bit_values() {
        let kind = SyncKind::new(ChangeType::Addition, Direction::Conflicting)
            .with_conflict(ConflictFlags::PSEUDO_CONFLICT);
        assert_eq!(kind.bits(), 1 | 12 | 16);
        assert_eq!(
            SyncKind::new(ChangeType::Deletion, Direction::Incoming).bits(),
            2 | 8
        );
        assert_eq!(SyncKind::two_way(ChangeType::Change).bits(), 3);
        assert_eq!(SyncKind::from_bits(1 | 12 | 16).unwrap(), kind);
    }

    #[test]
    fn from_bits_rejects_invalid_combinations() {
        // conflict flag without conflicting direction
        assert!(SyncKind::from_bits(3 | 4 | 64).is_err());
        // direction on in-sync
        assert!(SyncKind::from_bits(8).is_err());
        // unknown bit
        assert!(SyncKind::from_bits(128 | 3).is_err());
    }

    #[test]
    fn labels() {
        assert_eq!(SyncKind::IN_SYNC.to_string(), "in-sync");
        assert_eq!(
            SyncKind::new(ChangeType::Addition, Direction::Outgoing).to_string(),
            "outgoing addition"
        );
        assert_eq!(SyncKind::two_way(ChangeType::Deletion).to_string(), "deletion");
        let auto = SyncKind::new(ChangeType::Change, Direction::Conflicting)
            .with_conflict(ConflictFlags::AUTOMERGE_CONFLICT);
        assert_eq!(auto.to_string(), "conflicting change (auto)");
    }

    #[test]
    fn serde_uses_bits() {
        let kind = SyncKind::new(ChangeType::Change, Direction::Incoming);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "11");
        let back: SyncKind = serde_json::from_str("11").unwrap();
        assert_eq!(back, kind);
        assert!(serde_json::from_str::<SyncKind>("80").is_err());
    }
}
