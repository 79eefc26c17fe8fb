//! Property-based tests for drop points and wall tracking.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use suika_core::kind::Position;
use suika_engine::dropzone::DropZone;
use suika_engine::geometry::{tracking_velocity, Pose};

fn pose_strategy() -> impl Strategy<Value = Pose> {
    (-1000.0f64..1000.0, -1000.0f64..1000.0, -3.0f64..3.0)
        .prop_map(|(x, y, angle)| Pose::new(Position::new(x, y), angle))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Random drop points stay on the drop line, inside the margins.
    #[test]
    fn random_drop_respects_margin(
        width in 300.0f64..2000.0,
        height in 400.0f64..2000.0,
        margin in 0.0f64..0.6,
        pose in pose_strategy(),
        seed in any::<u64>(),
    ) {
        let zone = DropZone::new(width, height, 170.0);
        let mut rng = Pcg32::seed_from_u64(seed);
        let point = pose.world_to_local(zone.drop_point_random(&pose, margin, &mut rng));
        let (a, b) = zone.local_segment();
        let m = margin.min(0.5) * width;

        prop_assert!((point.y - a.y).abs() < 1e-6);
        prop_assert!(point.x >= a.x + m - 1e-6, "{} < {}", point.x, a.x + m);
        prop_assert!(point.x <= b.x - m + 1e-6, "{} > {}", point.x, b.x - m);
    }

    /// A cursor inside the container span always yields a point; one outside
    /// never does.
    #[test]
    fn cursor_inside_span_always_drops(
        width in 300.0f64..2000.0,
        r in -0.5f64..1.5,
        margin in 0.0f64..0.5,
        cx in -500.0f64..500.0,
    ) {
        let zone = DropZone::new(width, 1000.0, 170.0);
        let pose = Pose::new(Position::new(cx, 0.0), 0.0);
        let x = cx - width / 2.0 + r * width;
        let point = zone.drop_point_cursor(&pose, x, margin);
        if (1e-9..=1.0 - 1e-9).contains(&r) {
            let point = point.expect("inside the span");
            prop_assert!(point.x >= cx - width / 2.0 + margin * width - 1e-6);
            prop_assert!(point.x <= cx + width / 2.0 - margin * width + 1e-6);
        } else if !(-1e-9..=1.0 + 1e-9).contains(&r) {
            prop_assert!(point.is_none());
        }
    }

    /// Following the tracking velocity for one step with no damping lands
    /// exactly on the target position.
    #[test]
    fn undamped_tracking_reaches_target(
        current in pose_strategy(),
        target in pose_strategy(),
        dt in 0.001f64..0.1,
    ) {
        let twist = tracking_velocity(current, target, dt, 1.0);
        let x = current.position.x + twist.linear.x * dt;
        let y = current.position.y + twist.linear.y * dt;
        prop_assert!((x - target.position.x).abs() < 1e-6);
        prop_assert!((y - target.position.y).abs() < 1e-6);
        prop_assert!(twist.angular >= 0.0);
    }
}
