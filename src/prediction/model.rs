//! Per-cycle prediction of surrounding vehicles
//!
//! Every cycle the observed vehicles are converted to Frenet coordinates,
//! assigned to a lane and advanced by the elapsed cycle time. Nothing is
//! carried between cycles: a vehicle that disappears from sensor fusion is
//! simply absent from the next prediction set.

use super::sensor_fusion::SensorFusionRecord;
use crate::config::RoadConfig;
use crate::map::CoordinateTransform;
use std::collections::BTreeMap;
use tracing::debug;

/// Below this speed (m/s) a vehicle's velocity does not define its heading
const MIN_HEADING_SPEED: f64 = 0.1;

/// Predicted longitudinal state of another vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedVehicle {
    pub id: u32,
    /// Lane index derived from d; negative or past the last lane when off-road
    pub lane: i32,
    pub s: f64,
    pub d: f64,
    /// Longitudinal speed along the track (m/s)
    pub v_s: f64,
    /// Longitudinal acceleration (m/s^2); not observable from one report
    pub a_s: f64,
}

impl TrackedVehicle {
    /// Position along the track `t` seconds ahead (unwrapped)
    pub fn s_at(&self, t: f64) -> f64 {
        self.s + self.v_s * t + 0.5 * self.a_s * t * t
    }
}

/// Vehicles keyed by sensor fusion id
pub type Predictions = BTreeMap<u32, TrackedVehicle>;

/// Builds predictions from sensor fusion reports
#[derive(Debug, Clone)]
pub struct PredictionModel {
    transform: CoordinateTransform,
    road: RoadConfig,
}

impl PredictionModel {
    pub fn new(transform: CoordinateTransform, road: RoadConfig) -> Self {
        PredictionModel { transform, road }
    }

    /// Observe one vehicle without advancing it in time
    pub fn observe(&self, record: &SensorFusionRecord) -> TrackedVehicle {
        let heading = if record.speed() > MIN_HEADING_SPEED {
            record.vy.atan2(record.vx)
        } else {
            let closest = self.transform.closest_waypoint(record.x, record.y);
            let map = self.transform.map();
            map.get(closest).position().heading_to(&map.get(map.next_index(closest)).position())
        };
        let frenet = self.transform.to_frenet(record.x, record.y, heading);
        let track_heading = self.transform.track_heading(frenet.s);
        let v_s = record.vx * track_heading.cos() + record.vy * track_heading.sin();

        TrackedVehicle {
            id: record.id,
            lane: self.road.lane_of(frenet.d),
            s: frenet.s,
            d: frenet.d,
            v_s,
            a_s: 0.0,
        }
    }

    /// Predict every reported vehicle `dt` seconds ahead
    pub fn project(&self, sensor_fusion: &[SensorFusionRecord], dt: f64) -> Predictions {
        let predictions: Predictions = sensor_fusion
            .iter()
            .map(|record| {
                let mut vehicle = self.observe(record);
                vehicle.s = self.transform.map().normalize_s(vehicle.s_at(dt));
                (vehicle.id, vehicle)
            })
            .collect();
        debug!("predicted {} vehicles over {:.3} s", predictions.len(), dt);
        predictions
    }
}
