//! Planner configuration
//!
//! Every field has a default so a partial TOML file only needs to name
//! what it overrides. `PlannerConfig::default()` is the reference tuning
//! for a three-lane highway with a 50 mph limit.

use crate::common::{PlanningError, PlanningResult};
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub road: RoadConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub trajectory: TrajectoryConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub costs: CostWeights,
}

/// Road geometry
#[derive(Clone, Debug, Deserialize)]
pub struct RoadConfig {
    /// Width of every lane (m)
    #[serde(default = "default_lane_width")]
    pub lane_width: f64,

    /// Number of lanes; lane 0 is leftmost
    #[serde(default = "default_num_lanes")]
    pub num_lanes: usize,

    /// Track length override (m); computed from the map when absent
    #[serde(default)]
    pub max_s: Option<f64>,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            lane_width: default_lane_width(),
            num_lanes: default_num_lanes(),
            max_s: None,
        }
    }
}

impl RoadConfig {
    /// Lateral offset of a lane's center line
    pub fn lane_center(&self, lane: usize) -> f64 {
        self.lane_width * (lane as f64 + 0.5)
    }

    /// Lane index containing lateral offset `d`; may fall outside the road
    pub fn lane_of(&self, d: f64) -> i32 {
        (d / self.lane_width).floor() as i32
    }

    /// Whether `lane` is a drivable lane index
    pub fn contains_lane(&self, lane: i32) -> bool {
        lane >= 0 && (lane as usize) < self.num_lanes
    }

    /// Index of the center lane (the left one of the two middle lanes when even)
    pub fn center_lane(&self) -> usize {
        self.num_lanes.saturating_sub(1) / 2
    }
}

/// Dynamic limits of the ego vehicle
#[derive(Clone, Debug, Deserialize)]
pub struct LimitsConfig {
    /// Speed limit (m/s)
    #[serde(default = "default_speed_limit")]
    pub speed_limit: f64,

    /// Maximum longitudinal acceleration / deceleration (m/s^2)
    #[serde(default = "default_max_accel")]
    pub max_accel: f64,

    /// Maximum longitudinal jerk (m/s^3)
    #[serde(default = "default_max_jerk")]
    pub max_jerk: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            speed_limit: default_speed_limit(),
            max_accel: default_max_accel(),
            max_jerk: default_max_jerk(),
        }
    }
}

/// Trajectory sampling
#[derive(Clone, Debug, Deserialize)]
pub struct TrajectoryConfig {
    /// Time between consecutive path points (s)
    #[serde(default = "default_tick")]
    pub tick: f64,

    /// Number of points in every emitted path
    #[serde(default = "default_path_points")]
    pub path_points: usize,

    /// Longitudinal distance between far anchors (m)
    #[serde(default = "default_anchor_spacing")]
    pub anchor_spacing: f64,

    /// Number of far anchors placed ahead of the reference point
    #[serde(default = "default_anchor_count")]
    pub anchor_count: usize,

    /// Sub-steps per tick when walking the fitted curve by arc length
    #[serde(default = "default_arc_substeps")]
    pub arc_substeps: usize,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            tick: default_tick(),
            path_points: default_path_points(),
            anchor_spacing: default_anchor_spacing(),
            anchor_count: default_anchor_count(),
            arc_substeps: default_arc_substeps(),
        }
    }
}

/// Behaviour layer tuning
#[derive(Clone, Debug, Deserialize)]
pub struct BehaviorConfig {
    /// Vehicles farther than this (m) do not limit lane speed
    #[serde(default = "default_sensing_range")]
    pub sensing_range: f64,

    /// Minimum bumper gap at zero relative speed (m)
    #[serde(default = "default_min_gap")]
    pub min_gap: f64,

    /// Extra gap per m/s of closing speed (s)
    #[serde(default = "default_time_headway")]
    pub time_headway: f64,

    /// Speed correction per meter of gap error when following (1/s)
    #[serde(default = "default_gap_gain")]
    pub gap_gain: f64,

    /// Lateral distance to the committed lane center under which a lane change is complete (m)
    #[serde(default = "default_settle_tolerance")]
    pub settle_tolerance: f64,

    /// Cycle time assumed before a previous timestamp exists (s)
    #[serde(default = "default_nominal_cycle")]
    pub nominal_cycle: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            sensing_range: default_sensing_range(),
            min_gap: default_min_gap(),
            time_headway: default_time_headway(),
            gap_gain: default_gap_gain(),
            settle_tolerance: default_settle_tolerance(),
            nominal_cycle: default_nominal_cycle(),
        }
    }
}

/// Weights of the behaviour cost terms
#[derive(Clone, Debug, Deserialize)]
pub struct CostWeights {
    #[serde(default = "default_collision_weight")]
    pub collision: f64,
    #[serde(default = "default_efficiency_weight")]
    pub efficiency: f64,
    #[serde(default = "default_lane_change_weight")]
    pub lane_change: f64,
    #[serde(default = "default_center_lane_weight")]
    pub center_lane: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            collision: default_collision_weight(),
            efficiency: default_efficiency_weight(),
            lane_change: default_lane_change_weight(),
            center_lane: default_center_lane_weight(),
        }
    }
}

// Road
fn default_lane_width() -> f64 {
    4.0
}
fn default_num_lanes() -> usize {
    3
}

// Limits
fn default_speed_limit() -> f64 {
    22.0
}
fn default_max_accel() -> f64 {
    5.0
}
fn default_max_jerk() -> f64 {
    10.0
}

// Trajectory
fn default_tick() -> f64 {
    0.02
}
fn default_path_points() -> usize {
    50
}
fn default_anchor_spacing() -> f64 {
    30.0
}
fn default_anchor_count() -> usize {
    3
}
fn default_arc_substeps() -> usize {
    4
}

// Behaviour
fn default_sensing_range() -> f64 {
    60.0
}
fn default_min_gap() -> f64 {
    10.0
}
fn default_time_headway() -> f64 {
    1.0
}
fn default_gap_gain() -> f64 {
    0.5
}
fn default_settle_tolerance() -> f64 {
    1.0
}
fn default_nominal_cycle() -> f64 {
    0.02
}

// Costs
fn default_collision_weight() -> f64 {
    1.0e5
}
fn default_efficiency_weight() -> f64 {
    1.0
}
fn default_lane_change_weight() -> f64 {
    0.02
}
fn default_center_lane_weight() -> f64 {
    0.06
}

impl PlannerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> PlanningResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PlanningError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> PlanningResult<Self> {
        let config: PlannerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the planner cannot work with
    pub fn validate(&self) -> PlanningResult<()> {
        let positive = [
            ("road.lane_width", self.road.lane_width),
            ("limits.speed_limit", self.limits.speed_limit),
            ("limits.max_accel", self.limits.max_accel),
            ("limits.max_jerk", self.limits.max_jerk),
            ("trajectory.tick", self.trajectory.tick),
            ("trajectory.anchor_spacing", self.trajectory.anchor_spacing),
            ("behavior.nominal_cycle", self.behavior.nominal_cycle),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(PlanningError::Config(format!("{} must be positive, got {}", name, value)));
            }
        }
        if self.road.num_lanes == 0 {
            return Err(PlanningError::Config("road.num_lanes must be at least 1".to_string()));
        }
        if self.trajectory.path_points < 2 {
            return Err(PlanningError::Config("trajectory.path_points must be at least 2".to_string()));
        }
        if self.trajectory.anchor_count < 2 {
            return Err(PlanningError::Config("trajectory.anchor_count must be at least 2".to_string()));
        }
        if self.trajectory.arc_substeps == 0 {
            return Err(PlanningError::Config("trajectory.arc_substeps must be at least 1".to_string()));
        }
        Ok(())
    }
}
