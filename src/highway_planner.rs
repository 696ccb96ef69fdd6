//! Per-cycle planning driver
//!
//! Owns the ego state and every planning component. One call to
//! `plan_cycle` runs telemetry through ego update, prediction, behaviour and
//! trajectory generation and returns the path to send back.

use crate::behavior::{BehaviorPlanner, BehaviorState, Intent};
use crate::common::{Path2D, PlanningResult};
use crate::config::PlannerConfig;
use crate::map::{CoordinateTransform, WaypointMap};
use crate::path_planning::TrajectoryGenerator;
use crate::prediction::PredictionModel;
use crate::protocol::{self, SocketEvent, Telemetry, MANUAL_FRAME};
use crate::vehicle::EgoState;
use std::sync::Arc;
use tracing::{debug, warn};

/// Smallest cycle time used for finite differences (s)
const MIN_CYCLE_TIME: f64 = 1e-3;

pub struct HighwayPlanner {
    config: PlannerConfig,
    transform: CoordinateTransform,
    ego: EgoState,
    prediction: PredictionModel,
    behavior: BehaviorPlanner,
    generator: TrajectoryGenerator,
    last_timestamp: Option<f64>,
    last_intent: Option<Intent>,
}

impl HighwayPlanner {
    pub fn new(map: WaypointMap, config: PlannerConfig) -> PlanningResult<Self> {
        config.validate()?;
        let map = match config.road.max_s {
            Some(max_s) => map.set_max_s(max_s)?,
            None => map,
        };
        let transform = CoordinateTransform::new(Arc::new(map));
        Ok(HighwayPlanner {
            ego: EgoState::new(config.road.center_lane(), 0.0, 0.0, 0.0),
            prediction: PredictionModel::new(transform.clone(), config.road.clone()),
            behavior: BehaviorPlanner::new(&config),
            generator: TrajectoryGenerator::new(transform.clone(), &config),
            transform,
            config,
            last_timestamp: None,
            last_intent: None,
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn map(&self) -> &WaypointMap {
        self.transform.map()
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    pub fn ego(&self) -> &EgoState {
        &self.ego
    }

    pub fn behavior_state(&self) -> BehaviorState {
        self.behavior.state()
    }

    pub fn behavior(&self) -> &BehaviorPlanner {
        &self.behavior
    }

    /// Intent chosen in the most recent completed cycle
    pub fn last_intent(&self) -> Option<&Intent> {
        self.last_intent.as_ref()
    }

    /// Run one planning cycle on telemetry received at `timestamp` (s)
    ///
    /// Invalid telemetry is rejected with `MalformedInput` before any state
    /// changes, so the caller can skip the cycle and keep the previous path.
    pub fn plan_cycle(&mut self, telemetry: &Telemetry, timestamp: f64) -> PlanningResult<Path2D> {
        if let Err(e) = telemetry.validate() {
            warn!("skipping cycle: {}", e);
            return Err(e);
        }

        let dt = match self.last_timestamp {
            Some(last) => (timestamp - last).max(MIN_CYCLE_TIME),
            None => self.config.behavior.nominal_cycle,
        };
        self.last_timestamp = Some(timestamp);

        self.ego.update(telemetry, dt, &self.config.road);
        let predictions = self.prediction.project(&telemetry.sensor_fusion, dt);
        let intent = self.behavior.update_state(&self.ego, &predictions, self.transform.map(), dt);
        self.ego.lane = intent.target_lane;

        let tail = telemetry.previous_path();
        let path = self.generator.generate(&self.ego, &tail, telemetry.end_path_s, &intent);
        debug!(
            "cycle dt {:.3}: s {:.1} d {:.2} v {:.2} a {:.2}, {} lane {} at {:.1} m/s, {} tail points",
            dt, self.ego.s, self.ego.d, self.ego.v, self.ego.a,
            intent.state, intent.target_lane, intent.target_speed, tail.len()
        );
        self.last_intent = Some(intent);
        Ok(path)
    }

    /// Answer one socket frame; `Ok(None)` when no reply is due
    pub fn handle_frame(&mut self, frame: &str, timestamp: f64) -> PlanningResult<Option<String>> {
        match protocol::parse_frame(frame)? {
            Some(SocketEvent::Telemetry(telemetry)) => {
                let path = self.plan_cycle(&telemetry, timestamp)?;
                protocol::control_frame(&path).map(Some)
            }
            Some(SocketEvent::Manual) => Ok(Some(MANUAL_FRAME.to_string())),
            Some(SocketEvent::Other(event)) => {
                debug!("ignoring event {}", event);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PlanningError;
    use crate::map::synthetic::straight_track;

    fn planner() -> HighwayPlanner {
        HighwayPlanner::new(straight_track(100, 30.0).unwrap(), PlannerConfig::default()).unwrap()
    }

    fn telemetry(x: f64, d: f64, speed_mph: f64) -> Telemetry {
        Telemetry {
            x,
            y: -d,
            s: x,
            d,
            yaw: 0.0,
            speed: speed_mph,
            previous_path_x: vec![],
            previous_path_y: vec![],
            end_path_s: 0.0,
            end_path_d: 0.0,
            sensor_fusion: vec![],
        }
    }

    #[test]
    fn test_first_cycle_commits_lane_from_d() {
        let mut planner = planner();
        let path = planner.plan_cycle(&telemetry(100.0, 6.0, 0.0), 0.0).unwrap();
        assert_eq!(path.len(), 50);
        assert_eq!(planner.ego().lane, 1);
        assert_eq!(planner.behavior_state(), BehaviorState::KeepLane);
        assert!(planner.ego().is_initialized());
    }

    #[test]
    fn test_malformed_telemetry_leaves_state_untouched() {
        let mut planner = planner();
        planner.plan_cycle(&telemetry(100.0, 6.0, 20.0), 0.0).unwrap();
        let before = planner.ego().clone();

        let mut bad = telemetry(101.0, 6.0, 20.0);
        bad.previous_path_x = vec![1.0, 2.0];
        bad.previous_path_y = vec![1.0];
        let err = planner.plan_cycle(&bad, 0.02).unwrap_err();
        assert!(matches!(err, PlanningError::MalformedInput(_)));
        assert_eq!(planner.ego(), &before);

        bad = telemetry(101.0, f64::NAN, 20.0);
        assert!(planner.plan_cycle(&bad, 0.02).is_err());
        assert_eq!(planner.ego(), &before);
    }

    #[test]
    fn test_acceleration_uses_timestamps() {
        let mut planner = planner();
        planner.plan_cycle(&telemetry(100.0, 6.0, 10.0), 1.0).unwrap();
        assert_eq!(planner.ego().a, 0.0);
        planner.plan_cycle(&telemetry(101.0, 6.0, 11.0), 1.5).unwrap();
        let expected = 1.0 * crate::common::MPH_TO_MPS / 0.5;
        assert!((planner.ego().a - expected).abs() < 1e-9);
    }

    #[test]
    fn test_handle_frames() {
        let mut planner = planner();
        assert_eq!(planner.handle_frame("42[\"telemetry\",null]", 0.0).unwrap().as_deref(), Some(MANUAL_FRAME));
        assert!(planner.handle_frame("2", 0.0).unwrap().is_none());

        let frame = r#"42["telemetry",{"x":100,"y":-6,"yaw":0,"speed":0,"s":100,"d":6,"previous_path_x":[],"previous_path_y":[],"end_path_s":0,"end_path_d":0,"sensor_fusion":[]}]"#;
        let reply = planner.handle_frame(frame, 0.0).unwrap().unwrap();
        assert!(reply.starts_with("42[\"control\",{\"next_x\":["));
    }

    #[test]
    fn test_configured_track_length() {
        let mut config = PlannerConfig::default();
        config.road.max_s = Some(4000.0);
        let planner = HighwayPlanner::new(straight_track(100, 30.0).unwrap(), config).unwrap();
        assert_eq!(planner.map().max_s(), 4000.0);
    }
}
