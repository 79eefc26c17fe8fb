//! rapier2d integration: bodies, tagged colliders, stepping, contact dispatch.
//!
//! The [`PhysicsWorld`] owns the rapier2d simulation. Every collider carries
//! a [`ShapeTag`] in its user data. Each step:
//!
//! 1. rapier steps the simulation with the game's fixed interval.
//! 2. Collision events are collected, sorted, and turned into
//!    [`ContactEvent`]s carrying the tags of both colliders.
//! 3. The events are handed, in order, to the step's [`ContactListener`]
//!    before [`PhysicsWorld::step`] returns.
//!
//! Listeners must not touch the world: fruit mutations are queued and applied
//! once the step call has returned.
//!
//! # Determinism
//!
//! rapier2d is compiled with `enhanced-determinism`. Combined with a fixed
//! timestep and sorted event delivery, the simulation is fully deterministic
//! on the same platform.

use std::collections::HashMap;

use rapier2d::prelude::*;
use suika_core::kind::Position;
use suika_core::tags::{CollisionType, ShapeTag};
use suika_core::CollisionError;
use suika_core::config::PhysicsConfig;
use tracing::{trace, warn};

use crate::geometry::{Pose, Twist};

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn to_vector(p: Position) -> Vector<Real> {
    vector![p.x as Real, p.y as Real]
}

fn to_point(p: Position) -> Point<Real> {
    point![p.x as Real, p.y as Real]
}

fn from_vector(v: &Vector<Real>) -> Position {
    Position::new(f64::from(v.x), f64::from(v.y))
}

/// Interaction groups from raw category bits.
pub fn groups(memberships: u32, filter: u32) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(memberships),
        Group::from_bits_truncate(filter),
    )
}

/// Sort key giving a total order over collider handles.
fn handle_key(h: ColliderHandle) -> (u32, u32) {
    h.into_raw_parts()
}

// ---------------------------------------------------------------------------
// Shape descriptors
// ---------------------------------------------------------------------------

/// Material and filtering shared by every collider description.
#[derive(Debug, Clone, Copy)]
pub struct ColliderSpec {
    pub tag: ShapeTag,
    /// Category bits the collider belongs to.
    pub memberships: u32,
    /// Category bits the collider interacts with.
    pub filter: u32,
    pub friction: f64,
    pub restitution: f64,
    /// Sensors report overlaps but never produce a contact response.
    pub sensor: bool,
}

/// A rigid body together with its single collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyHandles {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

// ---------------------------------------------------------------------------
// Contact events
// ---------------------------------------------------------------------------

/// Whether two colliders started or stopped touching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactPhase {
    Begin,
    Separate,
}

/// A handler's answer: let the solver respond to the contact, or ignore it.
///
/// Rejection is realised by making the collider a sensor; a rejected contact
/// on two solid colliders is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactVerdict {
    Accept,
    Reject,
}

/// One pairwise contact change observed during a step.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactEvent {
    pub phase: ContactPhase,
    pub colliders: [ColliderHandle; 2],
    /// Tags of both colliders; `None` for an untagged collider.
    pub shapes: [Option<ShapeTag>; 2],
    /// At least one of the colliders is a sensor.
    pub sensor: bool,
}

impl ContactEvent {
    pub fn collision_types(&self) -> [Option<CollisionType>; 2] {
        self.shapes.map(|s| s.map(|t| t.collision_type))
    }

    /// Whether either shape carries collision type `ty`.
    pub fn involves(&self, ty: CollisionType) -> bool {
        self.collision_types().contains(&Some(ty))
    }
}

/// Receives the contact events of one step, in delivery order.
pub trait ContactListener {
    fn on_contact(&mut self, event: &ContactEvent);
}

/// Listener that drops every event.
impl ContactListener for () {
    fn on_contact(&mut self, _event: &ContactEvent) {}
}

// ---------------------------------------------------------------------------
// HandlerRegistry
// ---------------------------------------------------------------------------

/// A contact callback operating on a context `C`.
pub type ContactHandlerFn<C> = fn(&mut C, &ContactEvent) -> Result<ContactVerdict, CollisionError>;

/// Which pairs a handler is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKey {
    /// Exactly this pair of collision types, in either order.
    Pair(CollisionType, CollisionType),
    /// Any pair where at least one shape has this collision type.
    Wildcard(CollisionType),
}

impl HandlerKey {
    fn matches(&self, types: [Option<CollisionType>; 2]) -> bool {
        match *self {
            HandlerKey::Pair(a, b) => {
                types == [Some(a), Some(b)] || types == [Some(b), Some(a)]
            }
            HandlerKey::Wildcard(t) => types.contains(&Some(t)),
        }
    }
}

struct RegisteredHandler<C> {
    key: HandlerKey,
    phase: ContactPhase,
    func: ContactHandlerFn<C>,
}

/// Contact callbacks indexed by collision-type pair and phase.
///
/// Every handler matching an event runs, in registration order.
pub struct HandlerRegistry<C> {
    handlers: Vec<RegisteredHandler<C>>,
}

impl<C> Default for HandlerRegistry<C> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<C> HandlerRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pair(
        &mut self,
        a: CollisionType,
        b: CollisionType,
        phase: ContactPhase,
        func: ContactHandlerFn<C>,
    ) {
        self.handlers.push(RegisteredHandler {
            key: HandlerKey::Pair(a, b),
            phase,
            func,
        });
    }

    pub fn add_wildcard(&mut self, ty: CollisionType, phase: ContactPhase, func: ContactHandlerFn<C>) {
        self.handlers.push(RegisteredHandler {
            key: HandlerKey::Wildcard(ty),
            phase,
            func,
        });
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every handler matching `event` against `ctx`.
    ///
    /// The verdict is [`ContactVerdict::Reject`] if any handler rejects.
    /// The first handler error stops the dispatch of this event.
    pub fn dispatch(&self, ctx: &mut C, event: &ContactEvent) -> Result<ContactVerdict, CollisionError> {
        let types = event.collision_types();
        let mut verdict = ContactVerdict::Accept;
        for handler in &self.handlers {
            if handler.phase != event.phase || !handler.key.matches(types) {
                continue;
            }
            if (handler.func)(ctx, event)? == ContactVerdict::Reject {
                verdict = ContactVerdict::Reject;
            }
        }
        if verdict == ContactVerdict::Reject && !event.sensor {
            warn!(
                ?types,
                "contact rejected between solid colliders; make one of them a sensor"
            );
        }
        Ok(verdict)
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Owns the rapier2d simulation state.
///
/// Live tags are read back from collider user data. Tags of colliders removed
/// since the last step are kept aside so that the events reporting their
/// removal can still be attributed.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    /// Tags of colliders removed since the last step.
    retired: HashMap<ColliderHandle, ShapeTag>,
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        let integration_params = IntegrationParameters {
            dt: config.interval as Real,
            length_unit: config.length_unit as Real,
            ..IntegrationParameters::default()
        };
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, config.gravity as Real],
            integration_params,
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            retired: HashMap::new(),
        }
    }

    fn build_collider(shape: SharedShape, spec: &ColliderSpec) -> Collider {
        ColliderBuilder::new(shape)
            .friction(spec.friction as Real)
            .restitution(spec.restitution as Real)
            .sensor(spec.sensor)
            .collision_groups(groups(spec.memberships, spec.filter))
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(spec.tag.encode())
            .build()
    }

    fn insert(&mut self, body: RigidBody, collider: Collider) -> BodyHandles {
        let body = self.rigid_body_set.insert(body);
        let collider =
            self.collider_set
                .insert_with_parent(collider, body, &mut self.rigid_body_set);
        BodyHandles { body, collider }
    }

    /// Add a kinematic body at `pose` carrying a capsule between `a` and `b`
    /// (body-local coordinates).
    pub fn add_kinematic_segment(
        &mut self,
        pose: Pose,
        a: Position,
        b: Position,
        half_thickness: f64,
        spec: &ColliderSpec,
    ) -> BodyHandles {
        let body = RigidBodyBuilder::kinematic_velocity_based()
            .translation(to_vector(pose.position))
            .rotation(pose.angle as Real)
            .build();
        let shape = SharedShape::capsule(to_point(a), to_point(b), half_thickness as Real);
        let collider = Self::build_collider(shape, spec);
        self.insert(body, collider)
    }

    /// Add a dynamic disc.
    pub fn add_ball(&mut self, position: Position, radius: f64, spec: &ColliderSpec) -> BodyHandles {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(position))
            .build();
        let collider = Self::build_collider(SharedShape::ball(radius as Real), spec);
        self.insert(body, collider)
    }

    /// Remove a body and its colliders. Unknown handles are a no-op.
    pub fn remove_body(&mut self, body: RigidBodyHandle) {
        let colliders: Vec<ColliderHandle> = match self.rigid_body_set.get(body) {
            Some(rb) => rb.colliders().to_vec(),
            None => return,
        };
        for collider in colliders {
            if let Some(tag) = self.live_tag(collider) {
                self.retired.insert(collider, tag);
            }
        }
        self.rigid_body_set.remove(
            body,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Move a capsule's endpoints without touching its body pose.
    pub fn set_segment_endpoints(&mut self, collider: ColliderHandle, a: Position, b: Position) {
        if let Some(c) = self.collider_set.get_mut(collider) {
            let radius = c.shape().as_capsule().map_or(0.0, |cap| cap.radius);
            c.set_shape(SharedShape::capsule(to_point(a), to_point(b), radius));
        }
    }

    pub fn set_tag(&mut self, collider: ColliderHandle, tag: ShapeTag) {
        if let Some(c) = self.collider_set.get_mut(collider) {
            c.user_data = tag.encode();
        }
    }

    fn live_tag(&self, collider: ColliderHandle) -> Option<ShapeTag> {
        self.collider_set
            .get(collider)
            .and_then(|c| ShapeTag::decode(c.user_data))
    }

    /// Tag of a live collider, or of one removed since the last step.
    pub fn tag(&self, collider: ColliderHandle) -> Option<ShapeTag> {
        self.live_tag(collider)
            .or_else(|| self.retired.get(&collider).copied())
    }

    pub fn set_collision_groups(&mut self, collider: ColliderHandle, memberships: u32, filter: u32) {
        if let Some(c) = self.collider_set.get_mut(collider) {
            c.set_collision_groups(groups(memberships, filter));
        }
    }

    pub fn pose(&self, body: RigidBodyHandle) -> Option<Pose> {
        self.rigid_body_set.get(body).map(|rb| {
            Pose::new(
                from_vector(rb.translation()),
                f64::from(rb.rotation().angle()),
            )
        })
    }

    pub fn position(&self, body: RigidBodyHandle) -> Option<Position> {
        self.rigid_body_set
            .get(body)
            .map(|rb| from_vector(rb.translation()))
    }

    pub fn velocity(&self, body: RigidBodyHandle) -> Option<Twist> {
        self.rigid_body_set.get(body).map(|rb| Twist {
            linear: from_vector(rb.linvel()),
            angular: f64::from(rb.angvel()),
        })
    }

    pub fn set_velocity(&mut self, body: RigidBodyHandle, twist: Twist) {
        if let Some(rb) = self.rigid_body_set.get_mut(body) {
            rb.set_linvel(to_vector(twist.linear), true);
            rb.set_angvel(twist.angular as Real, true);
        }
    }

    /// Hand a body over to velocity-driven kinematic control.
    pub fn make_kinematic(&mut self, body: RigidBodyHandle) {
        if let Some(rb) = self.rigid_body_set.get_mut(body) {
            rb.set_body_type(RigidBodyType::KinematicVelocityBased, true);
        }
    }

    /// Give a kinematic body back to the solver. Its current velocity is kept.
    pub fn make_dynamic(&mut self, body: RigidBodyHandle) {
        if let Some(rb) = self.rigid_body_set.get_mut(body) {
            rb.set_body_type(RigidBodyType::Dynamic, true);
        }
    }

    /// Step the simulation by `dt` and deliver the step's contact events.
    ///
    /// Events are sorted by the (min, max) raw collider handles of their pair;
    /// the relative order of events for one pair is kept.
    pub fn step(&mut self, dt: f64, listener: &mut dyn ContactListener) {
        self.integration_params.dt = dt as Real;

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &event_handler,
        );

        let mut raw: Vec<CollisionEvent> = collision_recv.try_iter().collect();
        raw.sort_by_key(|e| {
            let a = handle_key(e.collider1());
            let b = handle_key(e.collider2());
            (a.min(b), a.max(b))
        });

        for event in raw {
            let (h1, h2) = (event.collider1(), event.collider2());
            let contact = ContactEvent {
                phase: if event.started() {
                    ContactPhase::Begin
                } else {
                    ContactPhase::Separate
                },
                colliders: [h1, h2],
                shapes: [self.tag(h1), self.tag(h2)],
                sensor: event.sensor(),
            };
            trace!(?contact, "contact event");
            listener.on_contact(&contact);
        }
        self.retired.clear();
    }

    /// Tags of every collider overlapping `collider` and allowed to interact
    /// with it, sorted by handle.
    pub fn intersections_with_collider(&self, collider: ColliderHandle) -> Vec<ShapeTag> {
        let Some(c) = self.collider_set.get(collider) else {
            return Vec::new();
        };
        let filter = QueryFilter::default()
            .exclude_collider(collider)
            .groups(c.collision_groups());
        let mut hits = Vec::new();
        self.query_pipeline.intersections_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            c.position(),
            c.shape(),
            filter,
            |h| {
                hits.push(h);
                true
            },
        );
        hits.sort_by_key(|&h| handle_key(h));
        hits.into_iter().filter_map(|h| self.tag(h)).collect()
    }

    /// Tags of every collider containing the world point, sorted by handle.
    pub fn colliders_at_point(&self, point: Position) -> Vec<ShapeTag> {
        let mut hits = Vec::new();
        self.query_pipeline.intersections_with_point(
            &self.rigid_body_set,
            &self.collider_set,
            &to_point(point),
            QueryFilter::default(),
            |h| {
                hits.push(h);
                true
            },
        );
        hits.sort_by_key(|&h| handle_key(h));
        hits.into_iter().filter_map(|h| self.tag(h)).collect()
    }

    /// Number of rigid bodies in the simulation.
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
