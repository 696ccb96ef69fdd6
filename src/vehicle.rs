//! Ego vehicle state
//!
//! Updated once per cycle from telemetry. `lane` is the lane the planner has
//! committed to, which during a lane change differs from the lane `d` is in.

use crate::common::{Pose2D, Point2D};
use crate::config::RoadConfig;
use crate::protocol::Telemetry;

#[derive(Debug, Clone, PartialEq)]
pub struct EgoState {
    /// Committed lane index, 0 = leftmost
    pub lane: usize,
    pub s: f64,
    pub d: f64,
    /// Longitudinal speed (m/s)
    pub v: f64,
    /// Finite-difference estimate of longitudinal acceleration (m/s^2)
    pub a: f64,
    pub x: f64,
    pub y: f64,
    /// Heading (rad)
    pub yaw: f64,
    initialized: bool,
}

impl EgoState {
    pub fn new(lane: usize, s: f64, v: f64, a: f64) -> Self {
        EgoState {
            lane,
            s,
            d: 0.0,
            v,
            a,
            x: 0.0,
            y: 0.0,
            yaw: 0.0,
            initialized: false,
        }
    }

    /// Ego centered in `lane`, already initialized so no lane is re-derived
    pub fn in_lane(road: &RoadConfig, lane: usize, s: f64, v: f64) -> Self {
        EgoState {
            d: road.lane_center(lane),
            initialized: true,
            ..EgoState::new(lane, s, v, 0.0)
        }
    }

    pub fn with_pose(mut self, x: f64, y: f64, yaw: f64) -> Self {
        self.x = x;
        self.y = y;
        self.yaw = yaw;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Refresh from a telemetry report received `dt` seconds after the previous one
    pub fn update(&mut self, telemetry: &Telemetry, dt: f64, road: &RoadConfig) {
        let v = telemetry.speed_mps();
        if self.initialized {
            self.a = (v - self.v) / dt;
        } else {
            self.a = 0.0;
            let lane = road.lane_of(telemetry.d).clamp(0, road.num_lanes as i32 - 1);
            self.lane = lane as usize;
            self.initialized = true;
        }
        self.v = v;
        self.s = telemetry.s;
        self.d = telemetry.d;
        self.x = telemetry.x;
        self.y = telemetry.y;
        self.yaw = telemetry.yaw_rad();
    }

    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.x, self.y, self.yaw)
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Whether the vehicle is within `tolerance` of its committed lane's center
    pub fn is_settled(&self, road: &RoadConfig, tolerance: f64) -> bool {
        (self.d - road.lane_center(self.lane)).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telemetry(d: f64, speed_mph: f64) -> Telemetry {
        Telemetry {
            x: 10.0,
            y: 20.0,
            s: 30.0,
            d,
            yaw: 90.0,
            speed: speed_mph,
            previous_path_x: vec![],
            previous_path_y: vec![],
            end_path_s: 0.0,
            end_path_d: 0.0,
            sensor_fusion: vec![],
        }
    }

    #[test]
    fn test_first_update_derives_lane() {
        let road = RoadConfig::default();
        let mut ego = EgoState::new(0, 0.0, 0.0, 0.0);
        ego.update(&telemetry(9.5, 10.0), 0.02, &road);
        assert_eq!(ego.lane, 2);
        assert_eq!(ego.a, 0.0);
        assert!((ego.yaw - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!(ego.is_initialized());
    }

    #[test]
    fn test_acceleration_is_finite_difference() {
        let road = RoadConfig::default();
        let mut ego = EgoState::new(1, 0.0, 0.0, 0.0);
        ego.update(&telemetry(6.0, 0.0), 0.02, &road);
        ego.update(&telemetry(6.0, 1.0), 0.5, &road);
        assert!((ego.v - 0.44704).abs() < 1e-12);
        assert!((ego.a - 0.44704 / 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_later_updates_keep_committed_lane() {
        let road = RoadConfig::default();
        let mut ego = EgoState::in_lane(&road, 0, 0.0, 10.0);
        ego.update(&telemetry(5.0, 22.0), 0.02, &road);
        assert_eq!(ego.lane, 0);
        assert!(!ego.is_settled(&road, 1.0));
    }

    #[test]
    fn test_off_road_lane_is_clamped() {
        let road = RoadConfig::default();
        let mut ego = EgoState::new(0, 0.0, 0.0, 0.0);
        ego.update(&telemetry(-1.0, 0.0), 0.02, &road);
        assert_eq!(ego.lane, 0);
    }
}
