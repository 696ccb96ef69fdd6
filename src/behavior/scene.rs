//! The ego's view of surrounding traffic for one cycle
//!
//! Gaps are wrap-aware s differences between the ego and each predicted
//! vehicle, both advanced by the cycle time.

use super::state_machine::BehaviorState;
use crate::config::{BehaviorConfig, RoadConfig};
use crate::map::WaypointMap;
use crate::prediction::{Predictions, TrackedVehicle};
use crate::vehicle::EgoState;
use ordered_float::OrderedFloat;

/// Everything the behaviour layer knows about one cycle
pub struct Scene<'a> {
    pub ego: &'a EgoState,
    pub predictions: &'a Predictions,
    pub map: &'a WaypointMap,
    pub road: &'a RoadConfig,
    pub behavior: &'a BehaviorConfig,
    pub speed_limit: f64,
    /// Projection horizon (s)
    pub dt: f64,
}

/// A reachable maneuver with the facts its cost is computed from
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub state: BehaviorState,
    /// Lane the maneuver is aiming for
    pub intended_lane: usize,
    /// Lane the vehicle occupies at the end of this cycle's maneuver
    pub final_lane: usize,
    pub target_speed: f64,
    pub intended_lane_speed: f64,
    pub final_lane_speed: f64,
    /// Gap to the vehicle ahead in the final lane and the buffer it must keep
    pub gap_ahead: Option<(f64, f64)>,
    /// Whether the intended lane has the safety buffer both ahead and behind
    pub intended_lane_clear: bool,
    /// Whether the previous lane change has completed
    pub settled: bool,
}

impl<'a> Scene<'a> {
    fn ego_s(&self) -> f64 {
        self.ego.s + self.ego.v * self.dt
    }

    fn gap_to(&self, vehicle: &TrackedVehicle) -> f64 {
        self.map.s_difference(self.ego_s(), vehicle.s)
    }

    fn in_lane(&self, lane: usize) -> impl Iterator<Item = &'a TrackedVehicle> + '_ {
        self.predictions.values().filter(move |v| v.lane == lane as i32)
    }

    /// Nearest vehicle level with or ahead of the ego in `lane`
    pub fn vehicle_ahead(&self, lane: usize) -> Option<(f64, &'a TrackedVehicle)> {
        self.in_lane(lane)
            .map(|v| (self.gap_to(v), v))
            .filter(|(gap, _)| *gap >= 0.0)
            .min_by_key(|(gap, _)| OrderedFloat(*gap))
    }

    /// Nearest vehicle behind the ego in `lane`, with the gap as a positive distance
    pub fn vehicle_behind(&self, lane: usize) -> Option<(f64, &'a TrackedVehicle)> {
        self.in_lane(lane)
            .map(|v| (-self.gap_to(v), v))
            .filter(|(gap, _)| *gap > 0.0)
            .min_by_key(|(gap, _)| OrderedFloat(*gap))
    }

    /// Gap required to a vehicle ahead moving at `v_other`
    pub fn buffer_ahead(&self, v_other: f64) -> f64 {
        self.behavior.min_gap + (self.ego.v - v_other).max(0.0) * self.behavior.time_headway
    }

    /// Gap required to a vehicle behind moving at `v_other`
    pub fn buffer_behind(&self, v_other: f64) -> f64 {
        self.behavior.min_gap + (v_other - self.ego.v).max(0.0) * self.behavior.time_headway
    }

    /// Whether `lane` has the safety buffer both ahead of and behind the ego
    pub fn lane_is_clear(&self, lane: usize) -> bool {
        let ahead_ok = self.vehicle_ahead(lane)
            .map_or(true, |(gap, v)| gap > self.buffer_ahead(v.v_s));
        let behind_ok = self.vehicle_behind(lane)
            .map_or(true, |(gap, v)| gap > self.buffer_behind(v.v_s));
        ahead_ok && behind_ok
    }

    /// Achievable speed in `lane`: bounded by the slowest vehicle ahead within sensing range
    pub fn lane_speed(&self, lane: usize) -> f64 {
        self.in_lane(lane)
            .filter(|v| {
                let gap = self.gap_to(v);
                gap >= 0.0 && gap <= self.behavior.sensing_range
            })
            .map(|v| v.v_s)
            .fold(self.speed_limit, f64::min)
            .max(0.0)
    }

    /// Speed to command in `lane`, following the nearest vehicle ahead if one is in range
    pub fn target_speed(&self, lane: usize) -> f64 {
        match self.vehicle_ahead(lane) {
            Some((gap, v)) if gap <= self.behavior.sensing_range => {
                let error = gap - self.buffer_ahead(v.v_s);
                (v.v_s + self.behavior.gap_gain * error).clamp(0.0, self.speed_limit)
            }
            _ => self.speed_limit,
        }
    }

    /// Build the candidate for moving into `state`; `None` if it leaves the road
    pub fn candidate(&self, state: BehaviorState) -> Option<Candidate> {
        let lane = self.ego.lane as i32;
        let intended = lane + state.lane_offset();
        if !self.road.contains_lane(intended) {
            return None;
        }
        let intended = intended as usize;
        let final_lane = if state.changes_lane() { intended } else { self.ego.lane };

        Some(Candidate {
            state,
            intended_lane: intended,
            final_lane,
            target_speed: self.target_speed(final_lane),
            intended_lane_speed: self.lane_speed(intended),
            final_lane_speed: self.lane_speed(final_lane),
            gap_ahead: self.vehicle_ahead(final_lane).map(|(gap, v)| (gap, self.buffer_ahead(v.v_s))),
            intended_lane_clear: self.lane_is_clear(intended),
            settled: self.ego.is_settled(self.road, self.behavior.settle_tolerance),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::synthetic::straight_track;

    fn vehicle(id: u32, lane: i32, s: f64, v_s: f64) -> TrackedVehicle {
        TrackedVehicle { id, lane, s, d: 4.0 * lane as f64 + 2.0, v_s, a_s: 0.0 }
    }

    #[test]
    fn test_gaps_and_lane_speed() {
        let map = straight_track(40, 30.0).unwrap();
        let road = RoadConfig::default();
        let behavior = BehaviorConfig::default();
        let ego = EgoState::in_lane(&road, 1, 100.0, 20.0);
        let predictions: Predictions = vec![
            vehicle(1, 1, 120.0, 10.0),
            vehicle(2, 1, 150.0, 8.0),
            vehicle(3, 1, 300.0, 1.0),
            vehicle(4, 0, 90.0, 25.0),
        ]
        .into_iter()
        .map(|v| (v.id, v))
        .collect();
        let scene = Scene {
            ego: &ego,
            predictions: &predictions,
            map: &map,
            road: &road,
            behavior: &behavior,
            speed_limit: 22.0,
            dt: 0.0,
        };

        let (gap, ahead) = scene.vehicle_ahead(1).unwrap();
        assert_eq!(ahead.id, 1);
        assert!((gap - 20.0).abs() < 1e-9);
        // vehicle 3 is beyond sensing range
        assert_eq!(scene.lane_speed(1), 8.0);
        assert_eq!(scene.lane_speed(2), 22.0);

        let (behind_gap, behind) = scene.vehicle_behind(0).unwrap();
        assert_eq!(behind.id, 4);
        assert!((behind_gap - 10.0).abs() < 1e-9);
        // closing at 5 m/s needs 15 m
        assert!(!scene.lane_is_clear(0));
        assert!(scene.lane_is_clear(2));
    }

    #[test]
    fn test_target_speed_follows_leader() {
        let map = straight_track(40, 30.0).unwrap();
        let road = RoadConfig::default();
        let behavior = BehaviorConfig::default();
        let ego = EgoState::in_lane(&road, 1, 100.0, 10.0);
        let at_buffer: Predictions = vec![(1, vehicle(1, 1, 110.0, 10.0))].into_iter().collect();
        let scene = Scene {
            ego: &ego,
            predictions: &at_buffer,
            map: &map,
            road: &road,
            behavior: &behavior,
            speed_limit: 22.0,
            dt: 0.0,
        };
        assert!((scene.target_speed(1) - 10.0).abs() < 1e-9);
        assert_eq!(scene.target_speed(0), 22.0);
    }

    #[test]
    fn test_candidate_lanes() {
        let map = straight_track(40, 30.0).unwrap();
        let road = RoadConfig::default();
        let behavior = BehaviorConfig::default();
        let ego = EgoState::in_lane(&road, 0, 100.0, 10.0);
        let predictions = Predictions::new();
        let scene = Scene {
            ego: &ego,
            predictions: &predictions,
            map: &map,
            road: &road,
            behavior: &behavior,
            speed_limit: 22.0,
            dt: 0.02,
        };
        assert!(scene.candidate(BehaviorState::LaneChangeLeft).is_none());
        let prepare = scene.candidate(BehaviorState::PrepareLaneChangeRight).unwrap();
        assert_eq!((prepare.intended_lane, prepare.final_lane), (1, 0));
        let change = scene.candidate(BehaviorState::LaneChangeRight).unwrap();
        assert_eq!((change.intended_lane, change.final_lane), (1, 1));
        assert!(change.settled);
    }
}
