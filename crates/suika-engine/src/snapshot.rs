//! Game snapshots with BLAKE3 hashing.
//!
//! [`GameSnapshot`] is a serializable summary of the observable game state:
//! tick counter, score, container pose and modes, every fruit and the merged
//! fruit waiting to spawn. Its `hash`
//! is the BLAKE3 hex digest of the JSON encoding of everything else, so two
//! runs with the same seed and inputs can be compared with one string.
//!
//! ```
//! use suika_engine::prelude::*;
//!
//! let mut game = Game::new(GameConfig::default(), 7).unwrap();
//! game.run_ticks(10).unwrap();
//! let snapshot = game.snapshot().unwrap();
//! assert_eq!(snapshot.tick, 10);
//! assert_eq!(snapshot.hash.len(), 64);
//! ```
//!
//! Snapshots are for observation and determinism checks; a game cannot be
//! restored from one, since the rapier state is not captured.

use serde::{Deserialize, Serialize};
use suika_core::kind::{FruitId, FruitKind, Position};

use crate::bocal::{ShakeMode, TumbleMode};
use crate::fruit::{Blink, FruitState};
use crate::schedule::SpawnRequest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub position: Position,
    pub angle: f64,
    pub width: f64,
    pub height: f64,
    pub shake: ShakeMode,
    pub tumble: TumbleMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FruitSnapshot {
    pub id: FruitId,
    pub kind: FruitKind,
    pub state: FruitState,
    pub blink: Blink,
    /// World position; `None` for the waiting fruit.
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub tick: u64,
    pub score: u32,
    pub gameover: bool,
    pub container: ContainerSnapshot,
    /// Fruit in ascending id order.
    pub fruits: Vec<FruitSnapshot>,
    /// Merged fruit not spawned yet, in scheduling order.
    pub spawns: Vec<SpawnRequest>,
    /// BLAKE3 hex digest (64 lowercase hex chars) of the other fields.
    pub hash: String,
}

impl GameSnapshot {
    /// Assemble a snapshot and compute its hash.
    pub fn new(
        tick: u64,
        score: u32,
        gameover: bool,
        container: ContainerSnapshot,
        fruits: Vec<FruitSnapshot>,
        spawns: Vec<SpawnRequest>,
    ) -> Result<Self, serde_json::Error> {
        let mut snapshot = Self {
            tick,
            score,
            gameover,
            container,
            fruits,
            spawns,
            hash: String::new(),
        };
        snapshot.hash = snapshot.compute_hash()?;
        Ok(snapshot)
    }

    /// Recompute the hash and compare it with the stored one.
    pub fn verify(&self) -> Result<bool, serde_json::Error> {
        Ok(self.compute_hash()? == self.hash)
    }

    fn compute_hash(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct HashableState<'a> {
            tick: u64,
            score: u32,
            gameover: bool,
            container: &'a ContainerSnapshot,
            fruits: &'a [FruitSnapshot],
            spawns: &'a [SpawnRequest],
        }

        let json_bytes = serde_json::to_vec(&HashableState {
            tick: self.tick,
            score: self.score,
            gameover: self.gameover,
            container: &self.container,
            fruits: &self.fruits,
            spawns: &self.spawns,
        })?;
        Ok(blake3::hash(&json_bytes).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> ContainerSnapshot {
        ContainerSnapshot {
            position: Position::new(700.0, 825.0),
            angle: 0.0,
            width: 1100.0,
            height: 1550.0,
            shake: ShakeMode::Off,
            tumble: TumbleMode::Off,
        }
    }

    #[test]
    fn hash_covers_fruit_state() {
        let fruit = FruitSnapshot {
            id: FruitId(1),
            kind: FruitKind::MIN,
            state: FruitState::Normal,
            blink: Blink::Off,
            position: Some(Position::new(1.0, 2.0)),
        };
        let a = GameSnapshot::new(5, 0, false, container(), vec![fruit.clone()], Vec::new()).unwrap();
        let mut moved = fruit;
        moved.position = Some(Position::new(1.0, 2.5));
        let b = GameSnapshot::new(5, 0, false, container(), vec![moved], Vec::new()).unwrap();
        assert_ne!(a.hash, b.hash);
        assert!(a.verify().unwrap());
    }

    #[test]
    fn tampered_snapshot_fails_verification() {
        let mut s = GameSnapshot::new(1, 10, false, container(), Vec::new(), Vec::new()).unwrap();
        s.score = 11;
        assert!(!s.verify().unwrap());
    }

    #[test]
    fn hash_covers_pending_spawns() {
        let spawn = SpawnRequest {
            kind: FruitKind::new(2).unwrap(),
            local: Position::new(0.0, 10.0),
        };
        let a = GameSnapshot::new(4, 0, false, container(), Vec::new(), Vec::new()).unwrap();
        let b = GameSnapshot::new(4, 0, false, container(), Vec::new(), vec![spawn]).unwrap();
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn snapshot_survives_json() {
        let spawn = SpawnRequest {
            kind: FruitKind::new(5).unwrap(),
            local: Position::new(-12.0, 40.0),
        };
        let s = GameSnapshot::new(3, 1, true, container(), Vec::new(), vec![spawn]).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        let back: GameSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert!(back.verify().unwrap());
    }
}
