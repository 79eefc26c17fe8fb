//! Fruit bodies and their life cycle.
//!
//! The [`FruitStore`] owns every fruit of a game and their rapier bodies.
//! A fruit moves through these states:
//!
//! ```text
//! Waiting --drop--> FirstDrop --normal--> Normal <--drag_start/drag_stop--> Dragged
//!                      |                    |                                 |
//!                      +--explode/merge_to--+---------------------------------+
//!                                           |
//!                                           v
//!                               Exploding / Merging --> Removed
//! ```
//!
//! Merge-engine transitions reach the store through a [`FruitContext`], the
//! [`FruitHost`] view pairing the store with the physics world.

use std::collections::BTreeMap;

use rapier2d::prelude::{ColliderHandle, RigidBodyHandle};
use serde::{Deserialize, Serialize};
use suika_core::action::FruitHost;
use suika_core::config::GameConfig;
use suika_core::kind::{FruitId, FruitKind, Position};
use suika_core::tags::{category, ShapeTag};
use tracing::{debug, trace};

use crate::geometry::{tracking_velocity, Pose, Twist};
use crate::physics::{BodyHandles, ColliderSpec, PhysicsWorld};

// ---------------------------------------------------------------------------
// FruitState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FruitState {
    /// Next fruit to drop; not in the physics world yet.
    Waiting,
    /// Dropped, first contact not resolved yet.
    FirstDrop,
    Normal,
    /// Kinematic, steered toward `target` every step.
    Dragged { target: Position },
    /// Leaving play; removed once `remaining` reaches zero.
    Exploding { remaining: f64 },
    /// Sliding onto `dest`; removed once `remaining` reaches zero.
    Merging { remaining: f64, dest: Position },
    Removed,
}

impl FruitState {
    /// Whether the fruit still takes part in collisions.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            FruitState::FirstDrop | FruitState::Normal | FruitState::Dragged { .. }
        )
    }
}

/// Overflow warning of a fruit resting on the redline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Blink {
    #[default]
    Off,
    /// Starts blinking after `remaining` seconds.
    Pending { remaining: f64 },
    On,
}

#[derive(Debug, Clone)]
pub struct Fruit {
    id: FruitId,
    kind: FruitKind,
    state: FruitState,
    blink: Blink,
    handles: Option<BodyHandles>,
}

impl Fruit {
    pub fn id(&self) -> FruitId {
        self.id
    }

    pub fn kind(&self) -> FruitKind {
        self.kind
    }

    pub fn state(&self) -> FruitState {
        self.state
    }

    pub fn blink(&self) -> Blink {
        self.blink
    }

    pub fn collider(&self) -> Option<ColliderHandle> {
        self.handles.map(|h| h.collider)
    }

    pub fn body(&self) -> Option<RigidBodyHandle> {
        self.handles.map(|h| h.body)
    }
}

// ---------------------------------------------------------------------------
// FruitStore
// ---------------------------------------------------------------------------

/// Every fruit of a game, keyed by id. Ids are never reused.
pub struct FruitStore {
    fruits: BTreeMap<FruitId, Fruit>,
    next_id: u64,
    next: Option<FruitId>,
    score: u32,
    friction: f64,
    elasticity: f64,
    explosion_delay: f64,
    merge_delay: f64,
}

impl FruitStore {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            fruits: BTreeMap::new(),
            next_id: 1,
            next: None,
            score: 0,
            friction: config.physics.friction,
            elasticity: config.physics.elasticity_fruit,
            explosion_delay: config.timing.explosion_delay,
            merge_delay: config.timing.merge_delay,
        }
    }

    fn allocate(&mut self, kind: FruitKind, state: FruitState) -> FruitId {
        let id = FruitId(self.next_id);
        self.next_id += 1;
        self.fruits.insert(
            id,
            Fruit {
                id,
                kind,
                state,
                blink: Blink::Off,
                handles: None,
            },
        );
        id
    }

    fn spec(&self, tag: ShapeTag, memberships: u32, filter: u32) -> ColliderSpec {
        ColliderSpec {
            tag,
            memberships,
            filter,
            friction: self.friction,
            restitution: self.elasticity,
            sensor: false,
        }
    }

    pub fn get(&self, id: FruitId) -> Option<&Fruit> {
        self.fruits.get(&id)
    }

    /// Fruit in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Fruit> {
        self.fruits.values()
    }

    /// Number of fruit in the physics world.
    pub fn in_play(&self) -> usize {
        self.fruits.values().filter(|f| f.handles.is_some()).count()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Replace the waiting fruit with a new one of `kind`.
    pub fn prepare_next(&mut self, kind: FruitKind) -> FruitId {
        if let Some(old) = self.next.take() {
            self.fruits.remove(&old);
        }
        let id = self.allocate(kind, FruitState::Waiting);
        self.next = Some(id);
        id
    }

    /// The waiting fruit, if any.
    pub fn peek_next(&self) -> Option<&Fruit> {
        self.next.and_then(|id| self.fruits.get(&id))
    }

    /// Put the waiting fruit into play at `position`, in first-drop mode.
    pub fn drop_next(&mut self, physics: &mut PhysicsWorld, position: Position) -> Option<FruitId> {
        let id = self.next.take()?;
        let kind = self.fruits.get(&id)?.kind;
        let spec = self.spec(
            ShapeTag::first_drop(id, kind),
            category::FRUIT_DROP,
            category::ALL ^ category::MAXLINE,
        );
        let handles = physics.add_ball(position, kind.radius(), &spec);
        if let Some(fruit) = self.fruits.get_mut(&id) {
            fruit.state = FruitState::FirstDrop;
            fruit.handles = Some(handles);
        }
        debug!(fruit = %id, kind = kind.get(), x = position.x, y = position.y, "fruit dropped");
        Some(id)
    }

    /// Add a settled fruit at `position`.
    pub fn spawn(&mut self, physics: &mut PhysicsWorld, kind: FruitKind, position: Position) -> FruitId {
        let id = self.allocate(kind, FruitState::Normal);
        let spec = self.spec(ShapeTag::fruit(id, kind), category::FRUIT, category::ALL);
        let handles = physics.add_ball(position, kind.radius(), &spec);
        if let Some(fruit) = self.fruits.get_mut(&id) {
            fruit.handles = Some(handles);
        }
        id
    }

    /// Spawn the product of a merge and score it.
    pub fn spawn_merged(
        &mut self,
        physics: &mut PhysicsWorld,
        kind: FruitKind,
        position: Position,
    ) -> FruitId {
        self.score += kind.points();
        let id = self.spawn(physics, kind, position);
        debug!(fruit = %id, kind = kind.get(), score = self.score, "merged fruit spawned");
        id
    }

    /// Advance animations and timers by `dt`, then remove finished fruit.
    pub fn update(&mut self, physics: &mut PhysicsWorld, dt: f64) {
        for fruit in self.fruits.values_mut() {
            if let Blink::Pending { remaining } = fruit.blink {
                fruit.blink = if remaining - dt <= 0.0 {
                    Blink::On
                } else {
                    Blink::Pending {
                        remaining: remaining - dt,
                    }
                };
            }
            fruit.state = match fruit.state {
                FruitState::Exploding { remaining } if remaining - dt > 0.0 => {
                    FruitState::Exploding {
                        remaining: remaining - dt,
                    }
                }
                FruitState::Merging { remaining, dest } if remaining - dt > 0.0 => {
                    FruitState::Merging {
                        remaining: remaining - dt,
                        dest,
                    }
                }
                FruitState::Exploding { .. } | FruitState::Merging { .. } => FruitState::Removed,
                other => other,
            };
        }
        self.cleanup(physics);
    }

    /// Remove the bodies of fruit that left play and forget them.
    pub fn cleanup(&mut self, physics: &mut PhysicsWorld) {
        let finished: Vec<FruitId> = self
            .fruits
            .values()
            .filter(|f| f.state == FruitState::Removed)
            .map(|f| f.id)
            .collect();
        for id in finished {
            if let Some(fruit) = self.fruits.remove(&id) {
                if let Some(handles) = fruit.handles {
                    physics.remove_body(handles.body);
                }
                trace!(fruit = %id, "fruit removed");
            }
        }
    }

    /// Take a settled fruit out of the solver and hold it at `target`.
    ///
    /// Returns false for fruit that are not in the `Normal` state.
    pub fn drag_start(&mut self, physics: &mut PhysicsWorld, id: FruitId, target: Position) -> bool {
        let Some(fruit) = self.fruits.get_mut(&id) else {
            return false;
        };
        if fruit.state != FruitState::Normal {
            debug!(fruit = %id, state = ?fruit.state, "drag ignored");
            return false;
        }
        let Some(handles) = fruit.handles else {
            return false;
        };
        fruit.state = FruitState::Dragged { target };
        physics.make_kinematic(handles.body);
        debug!(fruit = %id, x = target.x, y = target.y, "drag started");
        true
    }

    /// Move the target of a dragged fruit.
    pub fn drag_to(&mut self, id: FruitId, target: Position) {
        if let Some(fruit) = self.fruits.get_mut(&id) {
            if let FruitState::Dragged { .. } = fruit.state {
                fruit.state = FruitState::Dragged { target };
            }
        }
    }

    /// Give a dragged fruit back to the solver, keeping its velocity.
    pub fn drag_stop(&mut self, physics: &mut PhysicsWorld, id: FruitId) {
        let Some(fruit) = self.fruits.get_mut(&id) else {
            return;
        };
        if !matches!(fruit.state, FruitState::Dragged { .. }) {
            return;
        }
        fruit.state = FruitState::Normal;
        if let Some(handles) = fruit.handles {
            physics.make_dynamic(handles.body);
        }
        debug!(fruit = %id, "drag stopped");
    }

    /// Set the velocity of every dragged fruit so that it reaches its target
    /// over the next step of `dt`.
    pub fn steer_dragged(&self, physics: &mut PhysicsWorld, dt: f64) {
        for fruit in self.fruits.values() {
            let (FruitState::Dragged { target }, Some(handles)) = (fruit.state, fruit.handles) else {
                continue;
            };
            let Some(current) = physics.pose(handles.body) else {
                continue;
            };
            let twist = tracking_velocity(current, Pose::new(target, current.angle), dt, 1.0);
            physics.set_velocity(handles.body, twist);
        }
    }

    fn active_mut(&mut self, id: FruitId, action: &'static str) -> Option<&mut Fruit> {
        match self.fruits.get_mut(&id) {
            Some(fruit) if fruit.state.is_active() => Some(fruit),
            Some(fruit) => {
                debug!(fruit = %id, state = ?fruit.state, action, "transition ignored");
                None
            }
            None => {
                debug!(fruit = %id, action, "transition on unknown fruit ignored");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FruitContext
// ---------------------------------------------------------------------------

/// The fruit store paired with the physics world it lives in.
pub struct FruitContext<'a> {
    pub store: &'a mut FruitStore,
    pub physics: &'a mut PhysicsWorld,
}

impl<'a> FruitContext<'a> {
    pub fn new(store: &'a mut FruitStore, physics: &'a mut PhysicsWorld) -> Self {
        Self { store, physics }
    }
}

impl FruitHost for FruitContext<'_> {
    fn kind(&self, fruit: FruitId) -> Option<FruitKind> {
        self.store.get(fruit).map(Fruit::kind)
    }

    fn position(&self, fruit: FruitId) -> Option<Position> {
        let handles = self.store.get(fruit)?.handles?;
        self.physics.position(handles.body)
    }

    fn explode(&mut self, fruit: FruitId) {
        let delay = self.store.explosion_delay;
        let Some(f) = self.store.active_mut(fruit, "explode") else {
            return;
        };
        f.state = FruitState::Exploding { remaining: delay };
        f.blink = Blink::Off;
        if let Some(handles) = f.handles {
            self.physics
                .set_collision_groups(handles.collider, category::FRUIT_REMOVED, category::NONE);
            self.physics.make_kinematic(handles.body);
            self.physics.set_velocity(handles.body, Twist::default());
        }
        debug!(%fruit, "fruit exploding");
    }

    fn merge_to(&mut self, fruit: FruitId, dest: Position) {
        let delay = self.store.merge_delay;
        let Some(f) = self.store.active_mut(fruit, "merge_to") else {
            return;
        };
        f.state = FruitState::Merging {
            remaining: delay,
            dest,
        };
        f.blink = Blink::Off;
        let Some(handles) = f.handles else {
            return;
        };
        self.physics
            .set_collision_groups(handles.collider, category::FRUIT_MERGE, category::NONE);
        self.physics.make_kinematic(handles.body);
        if let Some(pos) = self.physics.position(handles.body) {
            let linear = if delay > 0.0 {
                Position::new((dest.x - pos.x) / delay, (dest.y - pos.y) / delay)
            } else {
                Position::ORIGIN
            };
            self.physics.set_velocity(
                handles.body,
                Twist {
                    linear,
                    angular: 0.0,
                },
            );
        }
        debug!(%fruit, dest_x = dest.x, dest_y = dest.y, "fruit merging");
    }

    fn blink(&mut self, fruit: FruitId, activate: bool, delay: Option<f64>) {
        let Some(f) = self.store.active_mut(fruit, "blink") else {
            return;
        };
        f.blink = match (activate, delay) {
            (false, _) => Blink::Off,
            (true, Some(remaining)) if remaining > 0.0 => Blink::Pending { remaining },
            (true, _) => Blink::On,
        };
    }

    fn normal(&mut self, fruit: FruitId) {
        let Some(f) = self.store.active_mut(fruit, "normal") else {
            return;
        };
        if f.state != FruitState::FirstDrop {
            return;
        }
        f.state = FruitState::Normal;
        if let Some(handles) = f.handles {
            self.physics
                .set_tag(handles.collider, ShapeTag::fruit(f.id, f.kind));
            self.physics
                .set_collision_groups(handles.collider, category::FRUIT, category::ALL);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
