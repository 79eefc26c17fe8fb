//! Container kinematic controller.
//!
//! The [`Bocal`] owns the container's reference body, its five
//! [`WallElement`]s and its [`DropZone`]. The reference body is a pose plus
//! velocities integrated here (its angle is never wrapped). Walls are
//! separate kinematic rapier bodies that track the reference body every step.
//!
//! Two orthogonal state machines drive the reference body:
//!
//! ```text
//! shake:  Off --shake_auto--> Auto
//!         Off/Auto --shake_mouse--> Mouse
//!         any --shake_stop--> Stopping --(within 1 unit of ref)--> Off
//! tumble: Off --tumble_once--> Once --(angle > 2π)--> Off
//! ```
//!
//! Step order: integrate the reference body, update shake, update tumble,
//! re-target every wall.

use std::f64::consts::{PI, TAU};

use rand::Rng;
use serde::{Deserialize, Serialize};
use suika_core::config::{GameConfig, ShakeConfig};
use suika_core::kind::{FruitId, Position};
use tracing::{debug, info};

use crate::dropzone::DropZone;
use crate::geometry::{Pose, Twist, NEGLIGIBLE};
use crate::physics::PhysicsWorld;
use crate::walls::{WallElement, WallRole};

/// Distance to the reference position under which a stopping shake snaps.
const STOP_DISTANCE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// Translation mode of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShakeMode {
    /// At rest on the reference position.
    #[default]
    Off,
    /// Horizontal oscillation with an accelerating frequency.
    Auto,
    /// Follows a target moved by mouse deltas, within the shake amplitude.
    Mouse,
    /// Gliding back to the reference position; snaps to it once close.
    Stopping,
}

/// Rotation mode of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TumbleMode {
    #[default]
    Off,
    /// One full positive turn, then back to `Off` at angle zero.
    Once,
}

/// Phase of the accelerating shake oscillation after `t` seconds.
///
/// The angular rate ramps linearly from `freq_min` to `freq_max` during
/// `accel_delay`, then holds at `freq_max`. The two branches agree at
/// `t = accel_delay`.
pub fn shake_phase(t: f64, shake: &ShakeConfig) -> f64 {
    let t = t.max(0.0);
    let d = shake.accel_delay;
    let k = (shake.freq_max - shake.freq_min) / 2.0;
    if t < d {
        2.0 * PI * t * (shake.freq_min + k * t / d)
    } else {
        2.0 * PI * t * (shake.freq_max - k * d / t)
    }
}

// ---------------------------------------------------------------------------
// Bocal
// ---------------------------------------------------------------------------

/// The container: a reference pose driven by the shake and tumble modes, and
/// the walls that follow it.
pub struct Bocal {
    /// Reference body pose. The angle is not wrapped.
    body: Pose,
    /// Reference body velocity, applied at the start of the next step.
    velocity: Twist,
    /// Rest position; shakes oscillate around it.
    position_ref: Position,
    width_ref: f64,
    height_ref: f64,
    /// One wall per [`WallRole`], in [`WallRole::ALL`] order.
    walls: Vec<WallElement>,
    dropzone: DropZone,
    shake: ShakeMode,
    tumble: TumbleMode,
    /// Simulation time seen by the controller.
    clock: f64,
    /// Clock value when the automatic shake started.
    shake_start: Option<f64>,
    /// Target of the mouse shake; `None` outside `ShakeMode::Mouse`.
    mouse_target: Option<Position>,
    shake_config: ShakeConfig,
    walls_damping: f64,
    redline_top_margin: f64,
}

impl Bocal {
    /// Build a `width` by `height` container centred on `center` and add its
    /// walls to `physics`.
    pub fn new(
        physics: &mut PhysicsWorld,
        center: Position,
        width: f64,
        height: f64,
        config: &GameConfig,
    ) -> Self {
        let body = Pose::new(center, 0.0);
        let walls = WallRole::ALL
            .iter()
            .map(|&role| WallElement::new(physics, role, body, width, height, config))
            .collect();
        let redline_top_margin = config.container.redline_top_margin;
        Self {
            body,
            velocity: Twist::default(),
            position_ref: center,
            width_ref: width,
            height_ref: height,
            walls,
            dropzone: DropZone::new(width, height, redline_top_margin),
            shake: ShakeMode::Off,
            tumble: TumbleMode::Off,
            clock: 0.0,
            shake_start: None,
            mouse_target: None,
            shake_config: config.shake.clone(),
            walls_damping: config.physics.walls_damping,
            redline_top_margin,
        }
    }

    /// Put the reference body back at rest on its reference position and
    /// clear both modes. Walls glide back on the following steps.
    pub fn reset(&mut self) {
        self.body = Pose::new(self.position_ref, 0.0);
        self.velocity = Twist::default();
        self.shake = ShakeMode::Off;
        self.shake_start = None;
        self.mouse_target = None;
        self.tumble = TumbleMode::Off;
    }

    // -- Coordinates --------------------------------------------------------

    /// Container-local point to world coordinates, through the current pose.
    pub fn to_world(&self, local: Position) -> Position {
        self.body.local_to_world(local)
    }

    /// World point to container-local coordinates.
    pub fn to_bocal(&self, world: Position) -> Position {
        self.body.world_to_local(world)
    }

    /// Current pose of the reference body.
    pub fn pose(&self) -> Pose {
        self.body
    }

    pub fn velocity(&self) -> Twist {
        self.velocity
    }

    pub fn position_ref(&self) -> Position {
        self.position_ref
    }

    /// Container width, read from the bottom wall.
    pub fn width(&self) -> f64 {
        self.wall(WallRole::Bottom)
            .map_or(self.width_ref, WallElement::length)
    }

    pub fn height(&self) -> f64 {
        self.height_ref
    }

    pub fn shake_mode(&self) -> ShakeMode {
        self.shake
    }

    pub fn tumble_mode(&self) -> TumbleMode {
        self.tumble
    }

    pub fn is_tumbling(&self) -> bool {
        self.tumble != TumbleMode::Off
    }

    pub fn wall(&self, role: WallRole) -> Option<&WallElement> {
        self.walls.iter().find(|w| w.role() == role)
    }

    pub fn walls(&self) -> &[WallElement] {
        &self.walls
    }

    // -- Queries ------------------------------------------------------------

    /// Fruit currently overlapping the redline, in ascending id order.
    ///
    /// Only settled fruit count; a fruit still in its first drop does not
    /// interact with the redline.
    pub fn fruits_on_maxline(&self, physics: &PhysicsWorld) -> Vec<FruitId> {
        let Some(maxline) = self.wall(WallRole::Maxline) else {
            return Vec::new();
        };
        let mut ids: Vec<FruitId> = physics
            .intersections_with_collider(maxline.handles().collider)
            .into_iter()
            .filter(|tag| tag.is_fruit_shape())
            .filter_map(|tag| tag.fruit.map(|f| f.id))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Drop point under the cursor, `margin` world units from the walls.
    pub fn drop_point_cursor(&self, x_cursor: f64, margin: f64) -> Option<Position> {
        self.dropzone
            .drop_point_cursor(&self.body, x_cursor, self.margin_ratio(margin))
    }

    /// Random drop point, `margin` world units from the walls.
    pub fn drop_point_random<R: Rng + ?Sized>(&self, margin: f64, rng: &mut R) -> Position {
        self.dropzone
            .drop_point_random(&self.body, self.margin_ratio(margin), rng)
    }

    fn margin_ratio(&self, margin: f64) -> f64 {
        let width = self.width();
        if width > NEGLIGIBLE {
            margin / width
        } else {
            0.5
        }
    }

    // -- Mode changes -------------------------------------------------------

    /// Start the automatic shake; its frequency ramps from the start time.
    pub fn shake_auto(&mut self) {
        info!("container shake: auto");
        self.shake = ShakeMode::Auto;
        self.shake_start = Some(self.clock);
    }

    /// Follow mouse deltas, starting from the reference position.
    pub fn shake_mouse(&mut self) {
        info!("container shake: mouse");
        self.shake = ShakeMode::Mouse;
        self.mouse_target = Some(self.position_ref);
    }

    /// Glide back to the reference position.
    pub fn shake_stop(&mut self) {
        debug!(from = ?self.shake, "container shake: stopping");
        self.shake = ShakeMode::Stopping;
        self.shake_start = None;
        self.mouse_target = None;
    }

    /// Spin the container through one full positive turn.
    pub fn tumble_once(&mut self) {
        info!("container tumble");
        self.tumble = TumbleMode::Once;
        self.velocity.angular = TAU * self.shake_config.tumble_freq;
    }

    /// Move the mouse-shake target by a scaled mouse delta, clamped to the
    /// shake amplitude around the reference position.
    pub fn on_mouse_motion(&mut self, dx: f64, dy: f64) {
        if self.shake != ShakeMode::Mouse {
            return;
        }
        let s = &self.shake_config;
        let current = self.mouse_target.unwrap_or(self.position_ref);
        let (x_ref, y_ref) = (self.position_ref.x, self.position_ref.y);
        self.mouse_target = Some(Position::new(
            (current.x + dx * s.mouse_gain).clamp(x_ref - s.amplitude_x, x_ref + s.amplitude_x),
            (current.y + dy * s.mouse_gain).clamp(y_ref - s.amplitude_y, y_ref + s.amplitude_y),
        ));
    }

    /// New reference centre and size.
    ///
    /// Walls and the drop zone are re-dimensioned at once; the body pose is
    /// untouched. A container at rest glides to its new centre; an active
    /// shake carries on around it.
    pub fn on_resize(&mut self, physics: &mut PhysicsWorld, center: Position, width: f64, height: f64) {
        self.position_ref = center;
        self.width_ref = width;
        self.height_ref = height;
        self.dropzone.on_resize(width, height);
        for wall in &mut self.walls {
            wall.on_resize(physics, width, height);
        }
        if self.shake == ShakeMode::Off {
            self.shake_stop();
        }
    }

    // -- Step ---------------------------------------------------------------

    /// Advance the controller by `dt` and send every wall toward its new
    /// target pose.
    pub fn step(&mut self, physics: &mut PhysicsWorld, dt: f64) {
        self.integrate(dt);
        self.clock += dt;
        self.update_shake(dt);
        self.update_tumble();
        self.update_walls(physics, dt);
    }

    fn integrate(&mut self, dt: f64) {
        self.body.position.x += self.velocity.linear.x * dt;
        self.body.position.y += self.velocity.linear.y * dt;
        self.body.angle += self.velocity.angular * dt;
    }

    fn update_shake(&mut self, dt: f64) {
        let pos = self.body.position;
        let toward = |target: Position, gain: f64| {
            if dt > NEGLIGIBLE {
                Position::new(gain * (target.x - pos.x) / dt, gain * (target.y - pos.y) / dt)
            } else {
                Position::ORIGIN
            }
        };

        self.velocity.linear = match self.shake {
            ShakeMode::Off => Position::ORIGIN,
            ShakeMode::Auto => {
                let t = self.clock - self.shake_start.unwrap_or(self.clock);
                let phase = shake_phase(t, &self.shake_config);
                let target = Position::new(
                    self.position_ref.x + self.shake_config.amplitude_x * phase.sin(),
                    self.position_ref.y,
                );
                toward(target, 1.0)
            }
            ShakeMode::Mouse => {
                let target = self.mouse_target.unwrap_or(self.position_ref);
                toward(target, self.shake_config.mouse_speed)
            }
            ShakeMode::Stopping => {
                if pos.distance(self.position_ref) < STOP_DISTANCE {
                    self.body.position = self.position_ref;
                    self.shake = ShakeMode::Off;
                    debug!("container shake: off");
                    Position::ORIGIN
                } else {
                    toward(self.position_ref, self.shake_config.return_speed)
                }
            }
        };
    }

    fn update_tumble(&mut self) {
        if self.tumble == TumbleMode::Once && self.body.angle > TAU {
            self.body.angle = 0.0;
            self.velocity.angular = 0.0;
            self.tumble = TumbleMode::Off;
            debug!("container tumble: off");
        }
    }

    fn update_walls(&self, physics: &mut PhysicsWorld, dt: f64) {
        for wall in &self.walls {
            let offset = wall
                .role()
                .bocal_offset(self.width_ref, self.height_ref, self.redline_top_margin);
            let target = Pose::new(self.to_world(offset), self.body.angle);
            wall.move_to(physics, target, dt, self.walls_damping);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
