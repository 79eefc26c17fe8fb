//! Fruit handles, kinds, and plain 2D positions.
//!
//! A [`FruitKind`] is an ordinal size class in `1..=FruitKind::COUNT`. Merging
//! two fruit of the same kind produces the next kind, capped at
//! [`FruitKind::MAX`]: two watermelons merge into a watermelon.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// 2D world or container-local coordinates. `y` grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

// ---------------------------------------------------------------------------
// FruitId
// ---------------------------------------------------------------------------

/// Opaque handle to a fruit owned by the fruit subsystem.
///
/// Handles are never reused within a game, so a stale handle simply stops
/// resolving instead of aliasing a newer fruit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FruitId(pub u64);

impl fmt::Display for FruitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fruit#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// FruitKind
// ---------------------------------------------------------------------------

/// Radius in world units for each kind, smallest first.
const RADII: [f64; FruitKind::COUNT as usize] = [
    24.0, 32.0, 44.0, 52.0, 66.0, 82.0, 96.0, 112.0, 136.0, 162.0, 192.0,
];

/// Score awarded when a fruit of each kind is created by a merge.
const POINTS: [u32; FruitKind::COUNT as usize] = [1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 66];

/// Discrete fruit size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FruitKind(u8);

impl FruitKind {
    /// Number of distinct kinds.
    pub const COUNT: u8 = 11;
    /// Smallest kind.
    pub const MIN: FruitKind = FruitKind(1);
    /// Largest kind. Merging two of these yields another one.
    pub const MAX: FruitKind = FruitKind(Self::COUNT);

    /// Build a kind from its ordinal, `None` outside `1..=COUNT`.
    pub fn new(ordinal: u8) -> Option<Self> {
        (1..=Self::COUNT).contains(&ordinal).then_some(Self(ordinal))
    }

    /// The ordinal in `1..=COUNT`.
    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    /// The kind produced by merging two fruit of this kind.
    pub fn merged(self) -> Self {
        Self((self.0 + 1).min(Self::COUNT))
    }

    pub fn radius(self) -> f64 {
        RADII[(self.0 - 1) as usize]
    }

    pub fn points(self) -> u32 {
        POINTS[(self.0 - 1) as usize]
    }

    /// Every kind, smallest first.
    pub fn all() -> impl Iterator<Item = FruitKind> {
        (1..=Self::COUNT).map(FruitKind)
    }
}

impl TryFrom<u8> for FruitKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        FruitKind::new(value).ok_or_else(|| format!("fruit kind {value} out of range"))
    }
}

impl From<FruitKind> for u8 {
    fn from(kind: FruitKind) -> u8 {
        kind.0
    }
}

impl fmt::Display for FruitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind {}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_range_is_enforced() {
        assert!(FruitKind::new(0).is_none());
        assert!(FruitKind::new(FruitKind::COUNT + 1).is_none());
        assert_eq!(FruitKind::new(1), Some(FruitKind::MIN));
        assert_eq!(FruitKind::new(FruitKind::COUNT), Some(FruitKind::MAX));
    }

    #[test]
    fn merged_kind_is_capped() {
        let k1 = FruitKind::new(1).unwrap();
        assert_eq!(k1.merged().get(), 2);
        assert_eq!(FruitKind::MAX.merged(), FruitKind::MAX);
    }

    #[test]
    fn radii_grow_with_kind() {
        let radii: Vec<f64> = FruitKind::all().map(FruitKind::radius).collect();
        assert_eq!(radii.len(), FruitKind::COUNT as usize);
        assert!(radii.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn kind_serde_rejects_out_of_range() {
        let ok: FruitKind = serde_json::from_str("4").unwrap();
        assert_eq!(ok.get(), 4);
        assert!(serde_json::from_str::<FruitKind>("0").is_err());
        assert!(serde_json::from_str::<FruitKind>("12").is_err());
    }

    #[test]
    fn fruit_id_display() {
        assert_eq!(FruitId(42).to_string(), "fruit#42");
    }

    #[test]
    fn position_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-12);
    }
}
