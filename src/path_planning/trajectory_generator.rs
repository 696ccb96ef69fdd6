//! Short-horizon trajectory generation
//!
//! The unconsumed tail of the previous path is kept as is. New points are
//! appended by fitting a cubic spline through anchors expressed in the frame
//! of the tail end, and walking that curve at a jerk-limited speed profile.

use super::cubic_spline::CubicSpline;
use crate::behavior::Intent;
use crate::common::{Path2D, Point2D, PlanningResult, Pose2D};
use crate::config::{LimitsConfig, PlannerConfig, RoadConfig, TrajectoryConfig};
use crate::map::CoordinateTransform;
use crate::vehicle::EgoState;
use tracing::{debug, warn};

/// Distance behind the ego of the synthesized first anchor (m)
const BACK_ANCHOR_DISTANCE: f64 = 1.0;

/// Tail points closer than this do not define a heading (m)
const MIN_HEADING_SPACING: f64 = 1e-6;

/// Trajectory generator
pub struct TrajectoryGenerator {
    transform: CoordinateTransform,
    road: RoadConfig,
    limits: LimitsConfig,
    config: TrajectoryConfig,
}

/// Where the new part of the path starts
#[derive(Debug, Clone, Copy)]
struct Reference {
    /// Pose at the last emitted point, heading along the path
    pose: Pose2D,
    /// Point before it, used as the first spline anchor
    previous: Point2D,
    s: f64,
    v: f64,
    a: f64,
}

impl TrajectoryGenerator {
    pub fn new(transform: CoordinateTransform, config: &PlannerConfig) -> Self {
        TrajectoryGenerator {
            transform,
            road: config.road.clone(),
            limits: config.limits.clone(),
            config: config.trajectory.clone(),
        }
    }

    /// Extend `tail` to a full path realizing `intent`
    ///
    /// `end_path_s` is the Frenet s of the last tail point and is ignored when
    /// the tail is empty. The result always has `path_points` points.
    pub fn generate(&self, ego: &EgoState, tail: &Path2D, end_path_s: f64, intent: &Intent) -> Path2D {
        let n = self.config.path_points;
        // a single leftover point carries no heading; restart from the measured pose
        let kept: &[Point2D] = if tail.len() < 2 { &[] } else { &tail.points[..tail.len().min(n)] };
        let mut path = Path2D::from_points(kept.to_vec());
        if path.len() == n {
            return path;
        }

        let reference = self.reference(ego, kept, end_path_s);
        let steps = n - path.len();
        let target_speed = intent.target_speed.clamp(0.0, self.limits.speed_limit);
        let speeds = self.speed_profile(reference.v, reference.a, target_speed, steps);
        debug!(
            "trajectory: {} kept, {} new, v {:.2} -> {:.2} (target {:.2}), lane {}",
            kept.len(), steps, reference.v, speeds.last().copied().unwrap_or(reference.v),
            target_speed, intent.target_lane
        );

        let new_points = match self.fit(&reference, intent.target_lane) {
            Ok(spline) => self.walk_spline(&spline, &reference.pose, &speeds),
            Err(e) => {
                warn!("trajectory fit failed ({}), extending straight ahead", e);
                self.extend_straight(&reference.pose, &speeds)
            }
        };
        path.points.extend(new_points);
        path
    }

    fn reference(&self, ego: &EgoState, tail: &[Point2D], end_path_s: f64) -> Reference {
        let tick = self.config.tick;
        match tail {
            [.., before, last] => {
                let spacing = before.distance(last);
                let yaw = if spacing > MIN_HEADING_SPACING { before.heading_to(last) } else { ego.yaw };
                let v = spacing / tick;
                let a = match tail {
                    [.., first, _, _] => (v - first.distance(before) / tick) / tick,
                    _ => 0.0,
                };
                Reference {
                    pose: Pose2D::new(last.x, last.y, yaw),
                    previous: *before,
                    s: end_path_s,
                    v,
                    a,
                }
            }
            _ => {
                let pose = ego.pose();
                let previous = Point2D::new(
                    pose.x - BACK_ANCHOR_DISTANCE * pose.yaw.cos(),
                    pose.y - BACK_ANCHOR_DISTANCE * pose.yaw.sin(),
                );
                Reference { pose, previous, s: ego.s, v: ego.v, a: 0.0 }
            }
        }
    }

    /// Spline through the anchors in the reference frame
    fn fit(&self, reference: &Reference, target_lane: usize) -> PlanningResult<CubicSpline> {
        let d = self.road.lane_center(target_lane);
        let far = (1..=self.config.anchor_count)
            .map(|k| self.transform.to_cartesian(reference.s + k as f64 * self.config.anchor_spacing, d));
        let anchors: Vec<Point2D> = [reference.previous, reference.pose.position()]
            .into_iter()
            .chain(far)
            .map(|p| reference.pose.to_local(&p))
            .collect();

        let xs: Vec<f64> = anchors.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = anchors.iter().map(|p| p.y).collect();
        CubicSpline::new(&xs, &ys)
    }

    /// Speed at each of the next `steps` ticks
    ///
    /// Acceleration follows the largest value from which it can still ramp
    /// down to zero at the jerk limit before reaching the target speed.
    pub fn speed_profile(&self, v0: f64, a0: f64, target: f64, steps: usize) -> Vec<f64> {
        let dt = self.config.tick;
        let max_accel = self.limits.max_accel;
        let jerk_step = self.limits.max_jerk * dt;
        let half_step = jerk_step / 2.0;

        let mut v = v0.clamp(0.0, self.limits.speed_limit);
        let mut a = a0.clamp(-max_accel, max_accel);
        let mut speeds = Vec::with_capacity(steps);
        for _ in 0..steps {
            let error = target - v;
            let reachable = ((half_step * half_step + 2.0 * self.limits.max_jerk * error.abs()).sqrt() - half_step)
                .min(max_accel);
            let desired = reachable.copysign(error);
            a += (desired - a).clamp(-jerk_step, jerk_step);

            let mut next = (v + a * dt).clamp(0.0, self.limits.speed_limit);
            if (target - next) * error <= 0.0 {
                next = target;
                a = 0.0;
            }
            v = next;
            speeds.push(v);
        }
        speeds
    }

    /// Walk the spline by arc length, one tick per speed
    fn walk_spline(&self, spline: &CubicSpline, frame: &Pose2D, speeds: &[f64]) -> Vec<Point2D> {
        let substeps = self.config.arc_substeps.max(1);
        let mut x = 0.0;
        speeds
            .iter()
            .map(|v| {
                let ds = v * self.config.tick / substeps as f64;
                for _ in 0..substeps {
                    let slope = spline.calc_d(x);
                    x += ds / (1.0 + slope * slope).sqrt();
                }
                frame.to_world(&Point2D::new(x, spline.calc(x)))
            })
            .collect()
    }

    /// Continue along the reference heading
    fn extend_straight(&self, frame: &Pose2D, speeds: &[f64]) -> Vec<Point2D> {
        let mut x = 0.0;
        speeds
            .iter()
            .map(|v| {
                x += v * self.config.tick;
                frame.to_world(&Point2D::new(x, 0.0))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::BehaviorState;
    use crate::map::synthetic::{circular_track, straight_track};
    use std::sync::Arc;

    fn generator(transform: CoordinateTransform) -> TrajectoryGenerator {
        TrajectoryGenerator::new(transform, &PlannerConfig::default())
    }

    fn straight() -> (TrajectoryGenerator, RoadConfig) {
        let map = Arc::new(straight_track(100, 30.0).unwrap());
        (generator(CoordinateTransform::new(map)), RoadConfig::default())
    }

    fn intent(target_lane: usize, target_speed: f64) -> Intent {
        Intent { state: BehaviorState::KeepLane, target_lane, target_speed }
    }

    fn speeds(path: &Path2D, tick: f64) -> Vec<f64> {
        path.spacings().iter().map(|ds| ds / tick).collect()
    }

    #[test]
    fn test_starts_from_rest() {
        let (gen, road) = straight();
        let ego = EgoState::in_lane(&road, 1, 100.0, 0.0).with_pose(100.0, -6.0, 0.0);
        let path = gen.generate(&ego, &Path2D::new(), 0.0, &intent(1, 22.0));

        assert_eq!(path.len(), 50);
        let v = speeds(&path, 0.02);
        assert!(v.windows(2).all(|w| w[1] >= w[0] - 1e-9));
        assert!(v.iter().all(|&s| s <= 22.0));
        for p in &path.points {
            assert!(p.x >= 100.0);
            assert!((p.y + 6.0).abs() < 1e-6);
        }
        // 1 s of jerk-limited start stays well below the limit
        assert!(v[v.len() - 1] < 5.0);
    }

    #[test]
    fn test_reuses_tail() {
        let (gen, road) = straight();
        let ego = EgoState::in_lane(&road, 1, 100.0, 15.0).with_pose(100.0, -6.0, 0.0);
        let first = gen.generate(&ego, &Path2D::new(), 0.0, &intent(1, 22.0));

        // the controller consumed three points
        let tail = Path2D::from_points(first.points[3..].to_vec());
        let end_s = tail.last().unwrap().x;
        let moved = ego.clone().with_pose(first.points[2].x, -6.0, 0.0);
        let second = gen.generate(&moved, &tail, end_s, &intent(1, 22.0));

        assert_eq!(second.len(), 50);
        assert_eq!(&second.points[..47], &tail.points[..]);
        let v = speeds(&second, 0.02);
        for w in v.windows(2) {
            let accel = (w[1] - w[0]) / 0.02;
            assert!(accel.abs() <= 5.0 + 1e-3, "accel {}", accel);
        }
    }

    #[test]
    fn test_single_point_tail_is_dropped() {
        let (gen, road) = straight();
        let ego = EgoState::in_lane(&road, 1, 100.0, 20.0).with_pose(100.0, -6.0, 0.0);
        let tail = Path2D::from_points(vec![Point2D::new(100.4, -6.0)]);
        let path = gen.generate(&ego, &tail, 100.4, &intent(1, 20.0));

        assert_eq!(path.len(), 50);
        let full = Path2D::from_points(std::iter::once(ego.position()).chain(path.points).collect());
        let v = speeds(&full, 0.02);
        assert!(v.iter().all(|s| (s - 20.0).abs() < 1e-6), "speeds {:?}", v);
        for w in v.windows(2) {
            assert!(((w[1] - w[0]) / 0.02).abs() <= 5.0 + 1e-6);
        }
    }

    #[test]
    fn test_long_tail_is_truncated() {
        let (gen, road) = straight();
        let ego = EgoState::in_lane(&road, 1, 100.0, 10.0).with_pose(100.0, -6.0, 0.0);
        let tail = Path2D::from_points((0..60).map(|i| Point2D::new(100.0 + 0.2 * i as f64, -6.0)).collect());
        let path = gen.generate(&ego, &tail, 112.0, &intent(1, 22.0));
        assert_eq!(path.len(), 50);
        assert_eq!(path.points[..], tail.points[..50]);
    }

    #[test]
    fn test_lane_change_moves_laterally() {
        let (gen, road) = straight();
        let ego = EgoState::in_lane(&road, 1, 100.0, 20.0).with_pose(100.0, -6.0, 0.0);
        let mut path = gen.generate(&ego, &Path2D::new(), 0.0, &intent(0, 20.0));
        // follow the trajectory for a few seconds
        for _ in 0..10 {
            let tail = Path2D::from_points(path.points[25..].to_vec());
            let end_s = tail.last().unwrap().x;
            path = gen.generate(&ego, &tail, end_s, &intent(0, 20.0));
            assert_eq!(path.len(), 50);
            assert!(path.points.iter().all(|p| p.is_finite()));
            assert!(path.points.iter().all(|p| p.y <= -2.0 + 0.3 && p.y >= -6.0 - 0.3));
        }
        let last = path.last().unwrap();
        assert!((last.y + 2.0).abs() < 0.5, "ended at y = {}", last.y);
    }

    #[test]
    fn test_follows_curved_track() {
        let map = Arc::new(circular_track(500.0, 2000).unwrap());
        let transform = CoordinateTransform::new(map);
        let gen = generator(transform.clone());
        let road = RoadConfig::default();
        let start = transform.to_cartesian(0.0, 6.0);
        let ego = EgoState::in_lane(&road, 1, 0.0, 20.0).with_pose(start.x, start.y, std::f64::consts::FRAC_PI_2);
        let path = gen.generate(&ego, &Path2D::new(), 0.0, &intent(1, 20.0));
        for p in &path.points {
            let frenet = transform.to_frenet(p.x, p.y, std::f64::consts::FRAC_PI_2);
            assert!((frenet.d - 6.0).abs() < 0.1, "d = {}", frenet.d);
        }
        let v = speeds(&path, 0.02);
        assert!(v.iter().all(|s| (s - 20.0).abs() < 0.1));
    }

    #[test]
    fn test_degenerate_tail_falls_back() {
        let (gen, road) = straight();
        let ego = EgoState::in_lane(&road, 1, 100.0, 10.0).with_pose(100.0, -6.0, 0.0);
        let tail = Path2D::from_points(vec![Point2D::new(100.0, -6.0); 2]);
        let path = gen.generate(&ego, &tail, 100.0, &intent(1, 10.0));
        assert_eq!(path.len(), 50);
        assert!(path.points.iter().all(|p| p.is_finite()));
        assert!(path.points.windows(2).all(|w| w[1].x >= w[0].x));
        assert!((path.last().unwrap().y + 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_speed_profile_limits() {
        let (gen, _) = straight();
        let cases = [(0.0, 22.0), (20.0, 5.0), (10.0, 10.5), (22.0, 0.0), (0.0, 0.3)];
        for (v0, target) in cases {
            let profile = gen.speed_profile(v0, 0.0, target, 1500);
            assert_eq!(*profile.last().unwrap(), target);
            let (lo, hi) = if v0 < target { (v0, target) } else { (target, v0) };
            assert!(profile.iter().all(|&v| v >= lo - 1e-9 && v <= hi + 1e-9));

            let full: Vec<f64> = std::iter::once(v0).chain(profile).collect();
            let accel: Vec<f64> = full.windows(2).map(|w| (w[1] - w[0]) / 0.02).collect();
            assert!(accel.iter().all(|a| a.abs() <= 5.0 + 1e-9));
            let jerk_ok = accel.windows(2).all(|w| ((w[1] - w[0]) / 0.02).abs() <= 1.2 * 10.0);
            assert!(jerk_ok, "jerk bound violated from {} to {}", v0, target);
        }
    }

    #[test]
    fn test_speed_profile_holds_target() {
        let (gen, _) = straight();
        let profile = gen.speed_profile(12.0, 0.0, 12.0, 50);
        assert!(profile.iter().all(|&v| v == 12.0));
    }
}
