//! Suika Engine -- rapier2d-backed simulation of the fruit-merge game.
//!
//! This crate builds on [`suika_core`] to run a complete game: a rapier2d
//! world whose contact events feed the merge engine, a kinematic container
//! that can shake and tumble while its walls follow it through the solver,
//! the fruit life cycle, delayed merge spawns and a fixed-step game loop
//! with BLAKE3 snapshots.
//!
//! # Quick Start
//!
//! ```
//! use suika_engine::prelude::*;
//!
//! let mut game = Game::new(GameConfig::default(), 42).unwrap();
//! game.toggle_autoplay();
//! game.run_ticks(240).unwrap();
//! assert_eq!(game.tick_count(), 240);
//! assert!(game.fruits().in_play() > 0);
//! ```

#![deny(unsafe_code)]

pub mod autoplay;
pub mod bocal;
pub mod collision;
pub mod countdown;
pub mod dropzone;
pub mod fruit;
pub mod game;
pub mod geometry;
pub mod physics;
pub mod policy;
pub mod schedule;
pub mod snapshot;
pub mod walls;

use suika_core::config::ConfigError;
use suika_core::CollisionError;

/// Re-export the rules crate for convenience.
pub use suika_core;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors surfaced by [`Game`](game::Game).
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The collision wiring produced an impossible contact. The tick is
    /// abandoned and the game should not be stepped further.
    #[error("collision processing failed at tick {tick}: {source}")]
    Collision {
        tick: u64,
        #[source]
        source: CollisionError,
    },

    #[error("snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use suika_core::prelude::*;

    pub use crate::autoplay::{Autoplayer, Pointer, PreviewQueue};
    pub use crate::bocal::{Bocal, ShakeMode, TumbleMode};
    pub use crate::countdown::Countdown;
    pub use crate::fruit::{Blink, Fruit, FruitState, FruitStore};
    pub use crate::game::{container_geometry, ContainerGeometry, Game, TickReport};
    pub use crate::geometry::{Pose, Twist};
    pub use crate::physics::{ContactEvent, ContactPhase, ContactVerdict, PhysicsWorld};
    pub use crate::policy::{DropPolicy, RandomPolicy};
    pub use crate::schedule::SpawnRequest;
    pub use crate::snapshot::GameSnapshot;
    pub use crate::walls::WallRole;
    pub use crate::GameError;
}
