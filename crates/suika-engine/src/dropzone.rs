//! Drop points along the container's drop line.
//!
//! The drop line is a horizontal segment in container-local coordinates,
//! halfway between the container top and the redline. A drop point is picked
//! by a normalized abscissa `r` in `[0, 1]` along that segment, kept at least
//! `margin` (as a fraction of the width) away from both ends.

use rand::Rng;
use suika_core::kind::Position;
use tracing::info;

use crate::geometry::Pose;

/// Below this world width the drop line is treated as degenerate.
const DEGENERATE_WIDTH: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DropZone {
    a: Position,
    b: Position,
    redline_top_margin: f64,
}

impl DropZone {
    pub fn new(width: f64, height: f64, redline_top_margin: f64) -> Self {
        let mut zone = Self {
            a: Position::ORIGIN,
            b: Position::ORIGIN,
            redline_top_margin,
        };
        zone.on_resize(width, height);
        zone
    }

    pub fn on_resize(&mut self, width: f64, height: f64) {
        let y = height / 2.0 - (self.redline_top_margin / 2.0).floor();
        self.a = Position::new(-width / 2.0, y);
        self.b = Position::new(width / 2.0, y);
    }

    /// Drop line endpoints in container-local coordinates.
    pub fn local_segment(&self) -> (Position, Position) {
        (self.a, self.b)
    }

    /// World point at abscissa `r` along the drop line.
    pub fn interpolate(&self, pose: &Pose, r: f64) -> Position {
        let local = Position::new(
            self.a.x + (self.b.x - self.a.x) * r,
            self.a.y + (self.b.y - self.a.y) * r,
        );
        pose.local_to_world(local)
    }

    /// Drop point under a cursor at world abscissa `x_cursor`.
    ///
    /// Returns `None` when the cursor lies outside the container span.
    /// `margin` is a fraction of the width; a margin of one half or more
    /// leaves only the centre.
    pub fn drop_point_cursor(&self, pose: &Pose, x_cursor: f64, margin: f64) -> Option<Position> {
        let left = pose.local_to_world(self.a);
        let right = pose.local_to_world(self.b);

        let span = right.x - left.x;
        let r = if span.abs() > DEGENERATE_WIDTH {
            (x_cursor - left.x) / span
        } else {
            0.5
        };

        if !(0.0..=1.0).contains(&r) {
            info!(x_cursor, left = left.x, right = right.x, "click outside the container");
            return None;
        }

        let margin = clamp_margin(margin);
        Some(self.interpolate(pose, r.clamp(margin, 1.0 - margin)))
    }

    /// Uniformly random drop point, `margin` away from both ends.
    pub fn drop_point_random<R: Rng + ?Sized>(&self, pose: &Pose, margin: f64, rng: &mut R) -> Position {
        let margin = clamp_margin(margin);
        let u: f64 = rng.gen();
        self.interpolate(pose, margin + (1.0 - 2.0 * margin) * u)
    }
}

fn clamp_margin(margin: f64) -> f64 {
    if margin.is_nan() {
        0.0
    } else {
        margin.clamp(0.0, 0.5)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
