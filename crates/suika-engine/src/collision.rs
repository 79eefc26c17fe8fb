//! Collision helper: from per-step contact events to fruit transitions.
//!
//! During [`PhysicsWorld::step`](crate::physics::PhysicsWorld::step) the
//! helper receives every contact event through its [`ContactListener`] impl
//! and dispatches it to the registered handlers. Handlers only append to the
//! step buffers: same-kind pairs go into the [`ContactGraph`], visual and
//! state transitions into the [`ActionQueue`].
//!
//! [`CollisionHelper::process`] then runs once the step has returned:
//!
//! 1. resolve each connected component of same-kind contacts into one merge;
//! 2. queue the explosion and merge transitions of every merge and schedule
//!    the spawn of the merged fruit in container-local coordinates;
//! 3. run every queued action in order and clear the buffers.
//!
//! A handler that detects miswired tags records a [`CollisionError`]; the
//! step's actions are then dropped and `process` returns the error.

use suika_core::action::{ActionQueue, FruitAction, FruitHost};
use suika_core::contact::{resolve, ContactGraph, MergeDecision};
use suika_core::kind::{FruitKind, Position};
use suika_core::tags::{CollisionType, FruitRef, ShapeTag};
use suika_core::CollisionError;
use tracing::{debug, error};

use crate::physics::{ContactEvent, ContactListener, ContactPhase, ContactVerdict, HandlerRegistry};
use crate::schedule::{Scheduler, SpawnRequest};

// ---------------------------------------------------------------------------
// Step buffers and handlers
// ---------------------------------------------------------------------------

/// Everything the handlers of one step may write to.
#[derive(Debug, Default)]
pub struct StepBuffers {
    /// Same-kind contacts between settled fruit, merged after the step.
    pub graph: ContactGraph,
    /// Transitions run once merges are resolved, in push order.
    pub actions: ActionQueue,
    /// Delay before a fruit touching the redline starts blinking.
    pub blink_delay: f64,
}

impl StepBuffers {
    fn clear(&mut self) {
        self.graph.clear();
        self.actions.clear();
    }
}

/// The fruit of a settled-fruit shape.
fn fruit_of(tag: Option<ShapeTag>) -> Option<FruitRef> {
    tag.filter(ShapeTag::is_fruit_shape).and_then(|t| t.fruit)
}

/// The fruit involved in a contact with a non-fruit element.
fn touching_fruit(event: &ContactEvent) -> Result<FruitRef, CollisionError> {
    fruit_of(event.shapes[0])
        .or_else(|| fruit_of(event.shapes[1]))
        .ok_or_else(|| {
            let [a, b] = event.collision_types();
            CollisionError::MissingFruit { a, b }
        })
}

fn same_kind_contact(buffers: &mut StepBuffers, event: &ContactEvent) -> Result<ContactVerdict, CollisionError> {
    let (Some(a), Some(b)) = (fruit_of(event.shapes[0]), fruit_of(event.shapes[1])) else {
        let [a, b] = event.collision_types();
        return Err(CollisionError::MissingFruit { a, b });
    };
    if a.kind != b.kind {
        return Err(CollisionError::KindMismatch {
            a: a.id,
            kind_a: a.kind,
            b: b.id,
            kind_b: b.kind,
        });
    }
    buffers.graph.record(a.id, b.id);
    Ok(ContactVerdict::Accept)
}

fn first_drop_contact(buffers: &mut StepBuffers, event: &ContactEvent) -> Result<ContactVerdict, CollisionError> {
    let first_drop = |tag: Option<ShapeTag>| {
        tag.filter(|t| t.collision_type == CollisionType::FirstDrop)
            .and_then(|t| t.fruit)
    };
    let dropped: Vec<FruitRef> = event.shapes.iter().filter_map(|&s| first_drop(s)).collect();
    if dropped.is_empty() {
        let [a, b] = event.collision_types();
        return Err(CollisionError::FirstDropUntagged { a, b });
    }
    for fruit in &dropped {
        buffers.actions.push(FruitAction::Normal(fruit.id));
    }

    // The first contact also counts as an ordinary one.
    let other = match dropped.as_slice() {
        // Two falling fruit meeting: both were normalized above, and a
        // same-kind pair is recorded for merging in this very step.
        [first, second] => Some((*first, *second)),
        [first] => fruit_of(event.shapes[0])
            .or_else(|| fruit_of(event.shapes[1]))
            .map(|other| (*first, other)),
        _ => None,
    };
    if let Some((first, other)) = other {
        if first.kind == other.kind {
            buffers.graph.record(first.id, other.id);
        }
    }
    Ok(ContactVerdict::Accept)
}

fn maxline_begin(buffers: &mut StepBuffers, event: &ContactEvent) -> Result<ContactVerdict, CollisionError> {
    let fruit = touching_fruit(event)?;
    buffers.actions.push(FruitAction::Blink {
        fruit: fruit.id,
        activate: true,
        delay: Some(buffers.blink_delay),
    });
    Ok(ContactVerdict::Reject)
}

fn maxline_separate(buffers: &mut StepBuffers, event: &ContactEvent) -> Result<ContactVerdict, CollisionError> {
    let fruit = touching_fruit(event)?;
    buffers.actions.push(FruitAction::Blink {
        fruit: fruit.id,
        activate: false,
        delay: None,
    });
    Ok(ContactVerdict::Reject)
}

// ---------------------------------------------------------------------------
// CollisionHelper
// ---------------------------------------------------------------------------

/// What one call to [`CollisionHelper::process`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub merges: Vec<MergeDecision>,
    /// Actions executed, in execution order.
    pub actions: Vec<FruitAction>,
}

/// Turns the contact events of a physics step into merges and fruit
/// transitions.
///
/// Call [`reset`](Self::reset) before the step, pass the helper to
/// [`PhysicsWorld::step`](crate::physics::PhysicsWorld::step) as its
/// listener, then call [`process`](Self::process).
pub struct CollisionHelper {
    registry: HandlerRegistry<StepBuffers>,
    buffers: StepBuffers,
    /// First handler error of the step.
    error: Option<CollisionError>,
    /// Delay between a merge and the spawn of the merged fruit.
    spawn_delay: f64,
}

impl CollisionHelper {
    /// Helper with every handler registered: same-kind pairs for each kind,
    /// first drop, redline begin and separate.
    pub fn new(blink_delay: f64, spawn_delay: f64) -> Self {
        let mut helper = Self {
            registry: HandlerRegistry::new(),
            buffers: StepBuffers {
                blink_delay,
                ..StepBuffers::default()
            },
            error: None,
            spawn_delay,
        };
        helper.setup_handlers();
        helper
    }

    fn setup_handlers(&mut self) {
        for kind in FruitKind::all() {
            let ty = CollisionType::Fruit(kind);
            self.registry
                .add_pair(ty, ty, ContactPhase::Begin, same_kind_contact);
        }
        self.registry
            .add_wildcard(CollisionType::FirstDrop, ContactPhase::Begin, first_drop_contact);
        self.registry
            .add_wildcard(CollisionType::Maxline, ContactPhase::Begin, maxline_begin);
        self.registry
            .add_wildcard(CollisionType::Maxline, ContactPhase::Separate, maxline_separate);
    }

    /// Clear the step buffers. Called before each physics step.
    pub fn reset(&mut self) {
        self.buffers.clear();
        self.error = None;
    }

    /// Same-kind contacts recorded so far this step.
    pub fn graph(&self) -> &ContactGraph {
        &self.buffers.graph
    }

    /// Actions queued so far this step.
    pub fn pending_actions(&self) -> &[FruitAction] {
        self.buffers.actions.actions()
    }

    /// Resolve the step's contacts and run the queued actions.
    ///
    /// `to_local` converts a world position into container-local coordinates;
    /// merged fruit are scheduled on `spawns` in that frame so they appear
    /// wherever the container is when the delay expires.
    pub fn process<H, F>(
        &mut self,
        host: &mut H,
        to_local: F,
        spawns: &mut Scheduler<SpawnRequest>,
    ) -> Result<StepReport, CollisionError>
    where
        H: FruitHost + ?Sized,
        F: Fn(Position) -> Position,
    {
        if let Some(err) = self.error.take() {
            self.buffers.clear();
            return Err(err);
        }

        let merges = match resolve(&self.buffers.graph, host) {
            Ok(merges) => merges,
            Err(err) => {
                self.buffers.clear();
                return Err(err);
            }
        };

        for merge in &merges {
            self.buffers.actions.push(FruitAction::Explode(merge.exploded));
            self.buffers.actions.push(FruitAction::MergeTo {
                fruit: merge.absorbed,
                dest: merge.position,
            });
            spawns.schedule_once(
                self.spawn_delay,
                SpawnRequest {
                    kind: merge.spawn_kind,
                    local: to_local(merge.position),
                },
            );
        }

        let actions = self.buffers.actions.apply(host);
        self.buffers.clear();
        if !merges.is_empty() {
            debug!(merges = merges.len(), actions = actions.len(), "collisions processed");
        }
        Ok(StepReport { merges, actions })
    }
}

impl ContactListener for CollisionHelper {
    fn on_contact(&mut self, event: &ContactEvent) {
        if let Err(err) = self.registry.dispatch(&mut self.buffers, event) {
            error!(%err, ?event, "collision handler failed");
            self.error.get_or_insert(err);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
