//! Container walls and the redline sensor.
//!
//! Each [`WallElement`] is a segment carried by its own kinematic body. Its
//! local shape (length and orientation) depends only on the container size;
//! its pose follows the container reference body through
//! [`WallElement::move_to`].

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};
use suika_core::config::GameConfig;
use suika_core::kind::Position;
use suika_core::tags::{category, CollisionType, ShapeTag};

use crate::geometry::{segment_endpoints, tracking_velocity, Pose, Twist};
use crate::physics::{BodyHandles, ColliderSpec, PhysicsWorld};

// ---------------------------------------------------------------------------
// WallRole
// ---------------------------------------------------------------------------

/// The five container elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallRole {
    Left,
    Right,
    Bottom,
    Top,
    /// The redline sensor.
    Maxline,
}

impl WallRole {
    pub const ALL: [WallRole; 5] = [
        WallRole::Left,
        WallRole::Right,
        WallRole::Bottom,
        WallRole::Top,
        WallRole::Maxline,
    ];

    /// Segment length and local angle for a `w` by `h` container.
    pub fn dimensions(self, w: f64, h: f64) -> (f64, f64) {
        match self {
            WallRole::Bottom | WallRole::Top | WallRole::Maxline => (w, 0.0),
            WallRole::Left | WallRole::Right => (h, FRAC_PI_2),
        }
    }

    /// Offset of the element from the container centre.
    pub fn bocal_offset(self, w: f64, h: f64, redline_top_margin: f64) -> Position {
        match self {
            WallRole::Bottom => Position::new(0.0, -h / 2.0),
            WallRole::Top => Position::new(0.0, h / 2.0),
            WallRole::Left => Position::new(-w / 2.0, 0.0),
            WallRole::Right => Position::new(w / 2.0, 0.0),
            WallRole::Maxline => Position::new(0.0, h / 2.0 - redline_top_margin),
        }
    }

    pub fn collision_type(self) -> CollisionType {
        match self {
            WallRole::Bottom | WallRole::Top => CollisionType::WallBottom,
            WallRole::Left | WallRole::Right => CollisionType::WallSide,
            WallRole::Maxline => CollisionType::Maxline,
        }
    }

    pub fn is_sensor(self) -> bool {
        self == WallRole::Maxline
    }

    fn thickness(self, config: &GameConfig) -> f64 {
        if self.is_sensor() {
            config.container.redline_thickness
        } else {
            config.container.wall_thickness
        }
    }

    fn collider_spec(self, config: &GameConfig) -> ColliderSpec {
        let tag = ShapeTag::element(self.collision_type());
        if self.is_sensor() {
            ColliderSpec {
                tag,
                memberships: category::MAXLINE,
                filter: category::ALL ^ category::WALLS,
                friction: 0.0,
                restitution: 0.0,
                sensor: true,
            }
        } else {
            ColliderSpec {
                tag,
                memberships: category::WALLS,
                filter: category::ALL,
                friction: config.physics.friction,
                restitution: config.physics.elasticity_walls,
                sensor: false,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// WallElement
// ---------------------------------------------------------------------------

/// A container segment on its own kinematic body.
#[derive(Debug, Clone)]
pub struct WallElement {
    role: WallRole,
    length: f64,
    local_angle: f64,
    handles: BodyHandles,
}

impl WallElement {
    /// Create the element for a `w` by `h` container, placed directly at its
    /// target pose relative to `container`.
    pub fn new(
        physics: &mut PhysicsWorld,
        role: WallRole,
        container: Pose,
        w: f64,
        h: f64,
        config: &GameConfig,
    ) -> Self {
        let (length, local_angle) = role.dimensions(w, h);
        let (a, b) = segment_endpoints(length, local_angle);
        let offset = role.bocal_offset(w, h, config.container.redline_top_margin);
        let pose = Pose::new(container.local_to_world(offset), container.angle);
        let handles = physics.add_kinematic_segment(
            pose,
            a,
            b,
            role.thickness(config) / 2.0,
            &role.collider_spec(config),
        );
        Self {
            role,
            length,
            local_angle,
            handles,
        }
    }

    pub fn role(&self) -> WallRole {
        self.role
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn handles(&self) -> BodyHandles {
        self.handles
    }

    /// Endpoints in the frame of the element's own body.
    pub fn local_coords(&self) -> (Position, Position) {
        segment_endpoints(self.length, self.local_angle)
    }

    /// Endpoints in world coordinates, through the body's current pose.
    pub fn world_coords(&self, physics: &PhysicsWorld) -> Option<(Position, Position)> {
        let pose = physics.pose(self.handles.body)?;
        let (a, b) = self.local_coords();
        Some((pose.local_to_world(a), pose.local_to_world(b)))
    }

    /// Re-dimension the segment for a new container size. The body pose is
    /// left alone.
    pub fn on_resize(&mut self, physics: &mut PhysicsWorld, w: f64, h: f64) {
        (self.length, self.local_angle) = self.role.dimensions(w, h);
        let (a, b) = self.local_coords();
        physics.set_segment_endpoints(self.handles.collider, a, b);
    }

    /// Set the body velocities that close `1 / damping` of the gap to
    /// `target` during the next step of `dt`.
    pub fn move_to(&self, physics: &mut PhysicsWorld, target: Pose, dt: f64, damping: f64) -> Twist {
        let Some(current) = physics.pose(self.handles.body) else {
            return Twist::default();
        };
        let twist = tracking_velocity(current, target, dt, damping);
        physics.set_velocity(self.handles.body, twist);
        twist
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
