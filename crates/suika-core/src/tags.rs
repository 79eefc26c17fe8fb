//! Collision-type tags and filtering categories carried by physics shapes.
//!
//! Every collider in the game carries a [`ShapeTag`] packed into the physics
//! engine's 128-bit user data slot:
//!
//! ```text
//! bits   0..32   collision type (raw u32, 0 = untagged)
//! bits  32..40   fruit kind (0 = no fruit)
//! bits  64..128  fruit id
//! ```
//!
//! Fruit carry their kind ordinal as collision type, so same-kind handlers can
//! be registered per `(kind, kind)` pair. A freshly dropped fruit carries
//! [`CollisionType::FirstDrop`] until its first contact has been resolved.

use serde::{Deserialize, Serialize};

use crate::kind::{FruitId, FruitKind};

// ---------------------------------------------------------------------------
// Filtering categories
// ---------------------------------------------------------------------------

/// Bit flags used as collision-group memberships and filters.
pub mod category {
    pub const WALLS: u32 = 1 << 0;
    pub const MAXLINE: u32 = 1 << 1;
    pub const FRUIT_DROP: u32 = 1 << 3;
    pub const FRUIT: u32 = 1 << 4;
    pub const FRUIT_MERGE: u32 = 1 << 5;
    pub const FRUIT_REMOVED: u32 = 1 << 6;
    /// Every category.
    pub const ALL: u32 = u32::MAX;
    /// No category.
    pub const NONE: u32 = 0;
}

// ---------------------------------------------------------------------------
// CollisionType
// ---------------------------------------------------------------------------

/// What a shape is, for handler dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionType {
    /// A settled fruit; its raw value is the kind ordinal.
    Fruit(FruitKind),
    WallBottom,
    WallSide,
    /// The redline sensor.
    Maxline,
    /// A fruit that has not had its first contact resolved yet.
    FirstDrop,
}

impl CollisionType {
    pub const RAW_WALL_BOTTOM: u32 = 1000;
    pub const RAW_WALL_SIDE: u32 = 1001;
    pub const RAW_MAXLINE: u32 = 1002;
    pub const RAW_FIRST_DROP: u32 = 1003;

    pub fn to_raw(self) -> u32 {
        match self {
            CollisionType::Fruit(kind) => u32::from(kind.get()),
            CollisionType::WallBottom => Self::RAW_WALL_BOTTOM,
            CollisionType::WallSide => Self::RAW_WALL_SIDE,
            CollisionType::Maxline => Self::RAW_MAXLINE,
            CollisionType::FirstDrop => Self::RAW_FIRST_DROP,
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            Self::RAW_WALL_BOTTOM => Some(CollisionType::WallBottom),
            Self::RAW_WALL_SIDE => Some(CollisionType::WallSide),
            Self::RAW_MAXLINE => Some(CollisionType::Maxline),
            Self::RAW_FIRST_DROP => Some(CollisionType::FirstDrop),
            other => u8::try_from(other)
                .ok()
                .and_then(FruitKind::new)
                .map(CollisionType::Fruit),
        }
    }

    /// Whether this is the type of a settled fruit (not first-drop).
    pub fn is_fruit(self) -> bool {
        matches!(self, CollisionType::Fruit(_))
    }
}

// ---------------------------------------------------------------------------
// ShapeTag
// ---------------------------------------------------------------------------

/// The fruit a shape belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FruitRef {
    pub id: FruitId,
    pub kind: FruitKind,
}

/// Per-shape metadata: its collision type and, for fruit, its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeTag {
    pub collision_type: CollisionType,
    pub fruit: Option<FruitRef>,
}

impl ShapeTag {
    /// Tag for a wall or sensor shape.
    pub fn element(collision_type: CollisionType) -> Self {
        Self {
            collision_type,
            fruit: None,
        }
    }

    /// Tag for a settled fruit: its collision type is its kind.
    pub fn fruit(id: FruitId, kind: FruitKind) -> Self {
        Self {
            collision_type: CollisionType::Fruit(kind),
            fruit: Some(FruitRef { id, kind }),
        }
    }

    /// Tag for a fruit that was just dropped into play.
    pub fn first_drop(id: FruitId, kind: FruitKind) -> Self {
        Self {
            collision_type: CollisionType::FirstDrop,
            fruit: Some(FruitRef { id, kind }),
        }
    }

    /// Whether the shape is a settled fruit (mirrors [`CollisionType::is_fruit`]).
    pub fn is_fruit_shape(&self) -> bool {
        self.collision_type.is_fruit() && self.fruit.is_some()
    }

    pub fn encode(&self) -> u128 {
        let ty = u128::from(self.collision_type.to_raw());
        match self.fruit {
            Some(FruitRef { id, kind }) => {
                ty | (u128::from(kind.get()) << 32) | (u128::from(id.0) << 64)
            }
            None => ty,
        }
    }

    /// Decode user data written by [`encode`](Self::encode). Returns `None`
    /// for untagged shapes (user data 0) or corrupt values.
    pub fn decode(raw: u128) -> Option<Self> {
        let collision_type = CollisionType::from_raw((raw & 0xFFFF_FFFF) as u32)?;
        let kind_raw = ((raw >> 32) & 0xFF) as u8;
        let fruit = if kind_raw == 0 {
            None
        } else {
            Some(FruitRef {
                id: FruitId((raw >> 64) as u64),
                kind: FruitKind::new(kind_raw)?,
            })
        };
        Some(Self {
            collision_type,
            fruit,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_collision_types_match_fruit_kinds() {
        for kind in FruitKind::all() {
            let ty = CollisionType::Fruit(kind);
            assert_eq!(ty.to_raw(), u32::from(kind.get()));
            assert_eq!(CollisionType::from_raw(ty.to_raw()), Some(ty));
        }
        assert_eq!(CollisionType::from_raw(0), None);
        assert_eq!(CollisionType::from_raw(12), None);
        assert_eq!(CollisionType::from_raw(1002), Some(CollisionType::Maxline));
    }

    #[test]
    fn fruit_tag_survives_encoding() {
        let kind = FruitKind::new(7).unwrap();
        let tag = ShapeTag::fruit(FruitId(u64::MAX - 3), kind);
        assert_eq!(ShapeTag::decode(tag.encode()), Some(tag));
        assert!(tag.is_fruit_shape());
    }

    #[test]
    fn first_drop_tag_is_not_a_fruit_shape() {
        let tag = ShapeTag::first_drop(FruitId(9), FruitKind::MIN);
        assert!(!tag.is_fruit_shape());
        assert_eq!(ShapeTag::decode(tag.encode()), Some(tag));
    }

    #[test]
    fn element_tags_have_no_fruit() {
        let tag = ShapeTag::element(CollisionType::WallSide);
        assert_eq!(tag.encode(), 1001);
        assert_eq!(ShapeTag::decode(1001), Some(tag));
    }

    #[test]
    fn untagged_user_data_decodes_to_none() {
        assert_eq!(ShapeTag::decode(0), None);
    }
}
