//! Rigid poses, local segments, and the kinematic tracking law.
//!
//! Container elements are segments expressed in the frame of the body that
//! carries them. A [`Pose`] maps those local coordinates to world
//! coordinates; [`tracking_velocity`] computes the velocities that move a
//! kinematic body toward a target pose without teleporting it.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use suika_core::kind::Position;

/// Below this a time step or a delta is treated as zero.
pub const NEGLIGIBLE: f64 = 1e-6;

/// Normalized angle deltas this close to a full turn count as no rotation.
///
/// Wall angles come back from the solver in single precision, so a wall that
/// lands a hair past its target would otherwise see a delta of almost `2π`
/// and spin a full turn to catch up.
pub const FULL_TURN_SLACK: f64 = 1e-4;

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// Position and rotation of a rigid body. The angle is not wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Position,
    pub angle: f64,
}

impl Pose {
    pub fn new(position: Position, angle: f64) -> Self {
        Self { position, angle }
    }

    /// Map a point from this body's frame into the world frame.
    pub fn local_to_world(&self, local: Position) -> Position {
        let r = rotate(local, self.angle);
        Position::new(self.position.x + r.x, self.position.y + r.y)
    }

    /// Map a world point into this body's frame.
    pub fn world_to_local(&self, world: Position) -> Position {
        let d = Position::new(world.x - self.position.x, world.y - self.position.y);
        rotate(d, -self.angle)
    }
}

/// Rotate `p` counter-clockwise by `angle` radians around the origin.
pub fn rotate(p: Position, angle: f64) -> Position {
    let (sin, cos) = angle.sin_cos();
    Position::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos)
}

/// Endpoints of a centred segment of `length` at `local_angle`:
/// `(-length/2, 0)` and `(+length/2, 0)` rotated by that angle.
pub fn segment_endpoints(length: f64, local_angle: f64) -> (Position, Position) {
    let half = length / 2.0;
    (
        rotate(Position::new(-half, 0.0), local_angle),
        rotate(Position::new(half, 0.0), local_angle),
    )
}

// ---------------------------------------------------------------------------
// Kinematic tracking
// ---------------------------------------------------------------------------

/// Linear and angular velocity of a kinematic body.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Twist {
    pub linear: Position,
    pub angular: f64,
}

/// Velocities that close `1 / damping` of the gap between `current` and
/// `target` over one step of `dt`.
///
/// The angular gap is normalized to `[0, 2π)`, so rotation always proceeds
/// in the positive direction. Zero is returned for a negligible `dt`, and
/// per component for a negligible positional or angular gap.
pub fn tracking_velocity(current: Pose, target: Pose, dt: f64, damping: f64) -> Twist {
    let mut twist = Twist::default();
    if dt <= NEGLIGIBLE {
        return twist;
    }
    let scale = dt * damping;

    let dx = target.position.x - current.position.x;
    let dy = target.position.y - current.position.y;
    if dx.hypot(dy) > NEGLIGIBLE {
        twist.linear = Position::new(dx / scale, dy / scale);
    }

    let d_angle = (target.angle - current.angle).rem_euclid(TAU);
    if d_angle > NEGLIGIBLE && d_angle < TAU - FULL_TURN_SLACK {
        twist.angular = d_angle / scale;
    }
    twist
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
