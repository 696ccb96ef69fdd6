//! highway_planner - motion planning core for autonomous highway driving
//!
//! This crate turns per-cycle telemetry (ego pose, sensor fusion, the unused
//! tail of the last path) into a lane decision and a smooth, jerk-limited
//! path sampled at the controller tick.

// Core modules
pub mod common;
pub mod config;
pub mod utils;

// Planning modules
pub mod map;
pub mod prediction;
pub mod behavior;
pub mod path_planning;
pub mod vehicle;
pub mod highway_planner;
pub mod protocol;

// Re-export common types for convenience
pub use common::{FrenetPoint, Path2D, Point2D, Pose2D};
pub use common::{CostFunction, PlanningError, PlanningResult};
pub use config::PlannerConfig;
pub use map::{CoordinateTransform, Waypoint, WaypointMap};
pub use prediction::{PredictionModel, Predictions, SensorFusionRecord, TrackedVehicle};
pub use behavior::{BehaviorPlanner, BehaviorState, Intent};
pub use path_planning::TrajectoryGenerator;
pub use vehicle::EgoState;
pub use highway_planner::HighwayPlanner;
pub use protocol::{Telemetry, TrajectoryMessage};
