//! Behaviour cost terms
//!
//! Each term maps a candidate to a raw cost, mostly in [0, 1]; the planner
//! sums the weighted terms and picks the cheapest candidate.

use super::scene::Candidate;
use super::state_machine::BehaviorState;
use crate::common::CostFunction;
use crate::config::PlannerConfig;

/// Raw collision cost of following inside the buffer, as a fraction of an unsafe lane change
const INSIDE_BUFFER_SCALE: f64 = 1e-4;

/// Penalises unsafe lane changes outright and tailgating proportionally
pub struct CollisionCost {
    pub weight: f64,
}

impl CostFunction<Candidate> for CollisionCost {
    fn name(&self) -> &'static str {
        "collision"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, candidate: &Candidate) -> f64 {
        if candidate.state.changes_lane() && !(candidate.intended_lane_clear && candidate.settled) {
            return 1.0;
        }
        match candidate.gap_ahead {
            Some((gap, buffer)) if gap < buffer && buffer > 0.0 => {
                INSIDE_BUFFER_SCALE * (1.0 - gap / buffer).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }
}

/// Penalises driving below the speed limit
///
/// Averages the deficit of the intended and the final lane, so preparing a
/// lane change toward a faster lane already pays off.
pub struct EfficiencyCost {
    pub weight: f64,
    pub speed_limit: f64,
}

impl CostFunction<Candidate> for EfficiencyCost {
    fn name(&self) -> &'static str {
        "efficiency"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, candidate: &Candidate) -> f64 {
        let deficit = 2.0 * self.speed_limit - candidate.intended_lane_speed - candidate.final_lane_speed;
        (deficit / (2.0 * self.speed_limit)).max(0.0)
    }
}

/// Flat penalty on any maneuver, the hysteresis against needless lane changes
pub struct LaneChangeCost {
    pub weight: f64,
}

impl CostFunction<Candidate> for LaneChangeCost {
    fn name(&self) -> &'static str {
        "lane_change"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, candidate: &Candidate) -> f64 {
        if candidate.state == BehaviorState::KeepLane {
            0.0
        } else {
            1.0
        }
    }
}

/// Mild pull toward the center lane
pub struct CenterLaneCost {
    pub weight: f64,
    pub center_lane: usize,
}

impl CostFunction<Candidate> for CenterLaneCost {
    fn name(&self) -> &'static str {
        "center_lane"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, candidate: &Candidate) -> f64 {
        let offset = |lane: usize| (lane as f64 - self.center_lane as f64).abs();
        (offset(candidate.intended_lane) + offset(candidate.final_lane)) / 2.0
    }
}

/// The standard set of cost terms with weights from the configuration
pub fn default_cost_functions(config: &PlannerConfig) -> Vec<Box<dyn CostFunction<Candidate>>> {
    vec![
        Box::new(CollisionCost { weight: config.costs.collision }),
        Box::new(EfficiencyCost {
            weight: config.costs.efficiency,
            speed_limit: config.limits.speed_limit,
        }),
        Box::new(LaneChangeCost { weight: config.costs.lane_change }),
        Box::new(CenterLaneCost {
            weight: config.costs.center_lane,
            center_lane: config.road.center_lane(),
        }),
    ]
}
