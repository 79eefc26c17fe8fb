//! Merges resolved from real rapier contact events.

use suika_engine::collision::CollisionHelper;
use suika_engine::fruit::{FruitContext, FruitState, FruitStore};
use suika_engine::physics::PhysicsWorld;
use suika_engine::prelude::*;
use suika_engine::schedule::{Scheduler, SpawnRequest};

const DT: f64 = 1.0 / 120.0;

struct Rig {
    physics: PhysicsWorld,
    store: FruitStore,
    collisions: CollisionHelper,
    spawns: Scheduler<SpawnRequest>,
}

impl Rig {
    fn new() -> Self {
        let config = GameConfig::default();
        Self {
            physics: PhysicsWorld::new(&config.physics),
            store: FruitStore::new(&config),
            collisions: CollisionHelper::new(config.timing.blink_delay, config.timing.spawn_delay),
            spawns: Scheduler::new(),
        }
    }

    /// One step of the contact pipeline with an identity container frame.
    fn step(&mut self) -> Vec<MergeDecision> {
        self.collisions.reset();
        self.physics.step(DT, &mut self.collisions);
        let mut host = FruitContext::new(&mut self.store, &mut self.physics);
        let report = self
            .collisions
            .process(&mut host, |p| p, &mut self.spawns)
            .unwrap();
        self.store.update(&mut self.physics, DT);
        for request in self.spawns.advance(DT) {
            self.store
                .spawn_merged(&mut self.physics, request.kind, request.local);
        }
        report.merges
    }
}

#[test]
fn touching_same_kind_fruit_merge_into_the_next_kind() {
    let mut rig = Rig::new();
    let kind = FruitKind::new(2).unwrap();
    let r = kind.radius();
    let low = rig.store.spawn(&mut rig.physics, kind, Position::new(0.0, 0.0));
    let high = rig
        .store
        .spawn(&mut rig.physics, kind, Position::new(0.0, 2.0 * r - 1.0));

    let merges = rig.step();
    assert_eq!(merges.len(), 1);
    let merge = &merges[0];
    assert_eq!(merge.exploded, low);
    assert_eq!(merge.absorbed, high);
    assert_eq!(merge.spawn_kind, kind.merged());
    assert!(matches!(
        rig.store.get(low).unwrap().state(),
        FruitState::Exploding { .. }
    ));
    assert!(matches!(
        rig.store.get(high).unwrap().state(),
        FruitState::Merging { .. }
    ));
    assert_eq!(rig.spawns.len(), 1);

    for _ in 0..60 {
        assert!(rig.step().is_empty());
    }
    assert!(rig.store.get(low).is_none());
    assert!(rig.store.get(high).is_none());
    assert_eq!(rig.store.score(), kind.merged().points());

    let spawned: Vec<_> = rig.store.iter().collect();
    assert_eq!(spawned.len(), 1);
    assert_eq!(spawned[0].kind(), kind.merged());
}

#[test]
fn different_kinds_do_not_merge() {
    let mut rig = Rig::new();
    let small = FruitKind::new(1).unwrap();
    let big = FruitKind::new(2).unwrap();
    rig.store.spawn(&mut rig.physics, small, Position::new(0.0, 0.0));
    rig.store.spawn(
        &mut rig.physics,
        big,
        Position::new(0.0, small.radius() + big.radius() - 1.0),
    );
    for _ in 0..10 {
        assert!(rig.step().is_empty());
    }
    assert_eq!(rig.store.score(), 0);
}

#[test]
fn chain_of_three_merges_the_two_lowest_only() {
    let mut rig = Rig::new();
    let kind = FruitKind::MIN;
    let d = 2.0 * kind.radius() - 1.0;
    let a = rig.store.spawn(&mut rig.physics, kind, Position::new(0.0, 0.0));
    let b = rig.store.spawn(&mut rig.physics, kind, Position::new(0.0, d));
    let c = rig.store.spawn(&mut rig.physics, kind, Position::new(0.0, 2.0 * d));

    let merges = rig.step();
    assert_eq!(merges.len(), 1);
    assert_eq!((merges[0].exploded, merges[0].absorbed), (a, b));
    assert_eq!(rig.store.get(c).unwrap().state(), FruitState::Normal);
}

#[test]
fn largest_kind_merges_into_itself() {
    let mut rig = Rig::new();
    let kind = FruitKind::MAX;
    let r = kind.radius();
    rig.store.spawn(&mut rig.physics, kind, Position::new(0.0, 0.0));
    rig.store
        .spawn(&mut rig.physics, kind, Position::new(0.0, 2.0 * r - 1.0));
    let merges = rig.step();
    assert_eq!(merges.len(), 1);
    assert_eq!(merges[0].spawn_kind, FruitKind::MAX);
}

#[test]
fn first_drop_becomes_normal_on_first_contact() {
    let mut rig = Rig::new();
    let kind = FruitKind::new(3).unwrap();
    let other = FruitKind::new(1).unwrap();
    rig.store.spawn(&mut rig.physics, other, Position::new(0.0, 0.0));
    rig.store.prepare_next(kind);
    let dropped = rig
        .store
        .drop_next(
            &mut rig.physics,
            Position::new(0.0, kind.radius() + other.radius() - 1.0),
        )
        .unwrap();
    assert_eq!(rig.store.get(dropped).unwrap().state(), FruitState::FirstDrop);

    rig.step();
    assert_eq!(rig.store.get(dropped).unwrap().state(), FruitState::Normal);
    let collider = rig.store.get(dropped).unwrap().collider().unwrap();
    assert_eq!(rig.physics.tag(collider), Some(ShapeTag::fruit(dropped, kind)));
}
