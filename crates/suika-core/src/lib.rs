//! Suika Core -- physics-free game rules for the fruit-merge arcade game.
//!
//! This crate holds everything the merge engine decides without touching a
//! physics engine: fruit kinds and handles, the collision-type tags carried by
//! physics shapes, the per-step same-kind contact graph and its resolution
//! into merge decisions, and the deferred [`ActionQueue`](action::ActionQueue)
//! that replays fruit transitions once a physics step has returned.
//!
//! # Quick Start
//!
//! ```
//! use suika_core::prelude::*;
//!
//! let mut graph = ContactGraph::new();
//! graph.record(FruitId(1), FruitId(2));
//! graph.record(FruitId(2), FruitId(3));
//! graph.record(FruitId(7), FruitId(8));
//!
//! let components = graph.components();
//! assert_eq!(components.len(), 2);
//! assert_eq!(components[0], vec![FruitId(1), FruitId(2), FruitId(3)]);
//! ```

#![deny(unsafe_code)]

pub mod action;
pub mod config;
pub mod contact;
pub mod kind;
pub mod tags;

use kind::{FruitId, FruitKind};
use tags::CollisionType;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Structural invariant violations detected while turning physics contacts
/// into game-state mutations.
///
/// Every variant means the collision-type wiring is wrong. None of them is
/// retried or ignored: the step that produced them is abandoned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollisionError {
    /// A fruit handler fired on a pair where neither shape belongs to a fruit.
    #[error("collision without fruit between {a:?} and {b:?}")]
    MissingFruit {
        a: Option<CollisionType>,
        b: Option<CollisionType>,
    },

    /// Two fruit joined by a same-kind edge do not share a kind.
    #[error("same-kind contact between {a} ({kind_a}) and {b} ({kind_b})")]
    KindMismatch {
        a: FruitId,
        kind_a: FruitKind,
        b: FruitId,
        kind_b: FruitKind,
    },

    /// The first-drop handler fired on a pair without a first-drop shape.
    #[error("first-drop handler called without a first-drop shape ({a:?}, {b:?})")]
    FirstDropUntagged {
        a: Option<CollisionType>,
        b: Option<CollisionType>,
    },

    /// A fruit recorded in the contact graph is unknown to the fruit host.
    #[error("fruit {0} recorded in a contact is unknown to the fruit host")]
    UnknownFruit(FruitId),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::action::{ActionQueue, FruitAction, FruitHost};
    pub use crate::config::{
        ConfigError, ContainerConfig, GameConfig, PhysicsConfig, ShakeConfig, TimingConfig,
    };
    pub use crate::contact::{resolve, resolve_component, ContactGraph, MergeDecision};
    pub use crate::kind::{FruitId, FruitKind, Position};
    pub use crate::tags::{category, CollisionType, FruitRef, ShapeTag};
    pub use crate::CollisionError;
}
