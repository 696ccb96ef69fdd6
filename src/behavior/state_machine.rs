/*!
 * Behaviour state machine for highway driving
 *
 * Five lane-level states with a fixed adjacency table. Every cycle each
 * reachable state is turned into a candidate maneuver, scored by the cost
 * functions, and the cheapest one becomes the new state. There is no
 * terminal state.
 */

use super::cost_functions::default_cost_functions;
use super::scene::{Candidate, Scene};
use crate::common::CostFunction;
use crate::config::{BehaviorConfig, PlannerConfig, RoadConfig};
use crate::map::WaypointMap;
use crate::prediction::Predictions;
use crate::vehicle::EgoState;
use ordered_float::OrderedFloat;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info};

/// Number of transitions kept for inspection
const HISTORY_LEN: usize = 32;

/// Lane-level driving state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorState {
    KeepLane,
    PrepareLaneChangeLeft,
    PrepareLaneChangeRight,
    LaneChangeLeft,
    LaneChangeRight,
}

use BehaviorState::*;

impl BehaviorState {
    pub const ALL: [BehaviorState; 5] = [
        KeepLane,
        PrepareLaneChangeLeft,
        PrepareLaneChangeRight,
        LaneChangeLeft,
        LaneChangeRight,
    ];

    /// States reachable in one cycle, KeepLane always first
    pub fn successors(self) -> &'static [BehaviorState] {
        match self {
            KeepLane => &[KeepLane, PrepareLaneChangeLeft, PrepareLaneChangeRight],
            PrepareLaneChangeLeft => &[KeepLane, PrepareLaneChangeLeft, LaneChangeLeft],
            PrepareLaneChangeRight => &[KeepLane, PrepareLaneChangeRight, LaneChangeRight],
            LaneChangeLeft => &[KeepLane, LaneChangeLeft],
            LaneChangeRight => &[KeepLane, LaneChangeRight],
        }
    }

    pub fn can_transition_to(self, next: BehaviorState) -> bool {
        self.successors().contains(&next)
    }

    /// Lane index offset of the lane this state aims for (left is -1)
    pub fn lane_offset(self) -> i32 {
        match self {
            KeepLane => 0,
            PrepareLaneChangeLeft | LaneChangeLeft => -1,
            PrepareLaneChangeRight | LaneChangeRight => 1,
        }
    }

    /// Whether the vehicle leaves its lane in this state
    pub fn changes_lane(self) -> bool {
        matches!(self, LaneChangeLeft | LaneChangeRight)
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            KeepLane => "KL",
            PrepareLaneChangeLeft => "PLCL",
            PrepareLaneChangeRight => "PLCR",
            LaneChangeLeft => "LCL",
            LaneChangeRight => "LCR",
        }
    }
}

impl Default for BehaviorState {
    fn default() -> Self {
        KeepLane
    }
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.abbreviation())
    }
}

/// Behaviour decision handed to the trajectory generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intent {
    pub state: BehaviorState,
    pub target_lane: usize,
    /// Desired speed (m/s)
    pub target_speed: f64,
}

/// Cost-driven finite state machine
pub struct BehaviorPlanner {
    state: BehaviorState,
    road: RoadConfig,
    behavior: BehaviorConfig,
    speed_limit: f64,
    cost_functions: Vec<Box<dyn CostFunction<Candidate>>>,
    transition_history: VecDeque<(BehaviorState, BehaviorState)>,
}

impl BehaviorPlanner {
    /// Create a planner in KeepLane
    pub fn new(config: &PlannerConfig) -> Self {
        Self::with_state(config, KeepLane)
    }

    /// Create a planner starting from an arbitrary state
    pub fn with_state(config: &PlannerConfig, state: BehaviorState) -> Self {
        BehaviorPlanner {
            state,
            road: config.road.clone(),
            behavior: config.behavior.clone(),
            speed_limit: config.limits.speed_limit,
            cost_functions: default_cost_functions(config),
            transition_history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    /// Replace the cost terms
    pub fn set_cost_functions(&mut self, cost_functions: Vec<Box<dyn CostFunction<Candidate>>>) {
        self.cost_functions = cost_functions;
    }

    pub fn state(&self) -> BehaviorState {
        self.state
    }

    /// Most recent state changes, oldest first
    pub fn transition_history(&self) -> impl Iterator<Item = &(BehaviorState, BehaviorState)> {
        self.transition_history.iter()
    }

    fn scene<'a>(
        &'a self,
        ego: &'a EgoState,
        predictions: &'a Predictions,
        map: &'a WaypointMap,
        dt: f64,
    ) -> Scene<'a> {
        Scene {
            ego,
            predictions,
            map,
            road: &self.road,
            behavior: &self.behavior,
            speed_limit: self.speed_limit,
            dt,
        }
    }

    /// Total weighted cost of a candidate
    pub fn total_cost(&self, candidate: &Candidate) -> f64 {
        self.cost_functions.iter().map(|f| f.weighted(candidate)).sum()
    }

    /// Score every reachable state, in adjacency order
    pub fn evaluate(
        &self,
        ego: &EgoState,
        predictions: &Predictions,
        map: &WaypointMap,
        dt: f64,
    ) -> Vec<(Candidate, f64)> {
        let scene = self.scene(ego, predictions, map, dt);
        self.state
            .successors()
            .iter()
            .filter_map(|&state| scene.candidate(state))
            .map(|candidate| {
                let cost = self.total_cost(&candidate);
                debug!("  {:>4} lane {} -> {}: cost {:.4}", candidate.state, candidate.intended_lane, candidate.final_lane, cost);
                (candidate, cost)
            })
            .collect()
    }

    /// Choose the next state and return the intent it implies
    pub fn update_state(
        &mut self,
        ego: &EgoState,
        predictions: &Predictions,
        map: &WaypointMap,
        dt: f64,
    ) -> Intent {
        let best = self
            .evaluate(ego, predictions, map, dt)
            .into_iter()
            .min_by_key(|(_, cost)| OrderedFloat(*cost))
            .map(|(candidate, _)| candidate);

        let intent = match best {
            Some(candidate) => Intent {
                state: candidate.state,
                target_lane: candidate.final_lane,
                target_speed: candidate.target_speed,
            },
            // KeepLane is always on the road, so this only happens for an off-road ego
            None => Intent {
                state: KeepLane,
                target_lane: ego.lane.min(self.road.num_lanes - 1),
                target_speed: self.scene(ego, predictions, map, dt).target_speed(ego.lane),
            },
        };

        if intent.state != self.state {
            info!(
                "behaviour {} -> {} (lane {} -> {}, {:.1} m/s)",
                self.state, intent.state, ego.lane, intent.target_lane, intent.target_speed
            );
            if self.transition_history.len() == HISTORY_LEN {
                self.transition_history.pop_front();
            }
            self.transition_history.push_back((self.state, intent.state));
        }
        self.state = intent.state;
        intent
    }

    /// Text representation of the state machine
    pub fn generate_diagram(&self) -> String {
        let mut diagram = Vec::new();
        diagram.push("Behaviour state machine".to_string());
        diagram.push(format!("Current State: {}", self.state));
        diagram.push("".to_string());

        diagram.push("Transitions:".to_string());
        for state in BehaviorState::ALL {
            let marker = if state == self.state { " [CURRENT]" } else { "" };
            let targets: Vec<&str> = state.successors().iter().map(|s| s.abbreviation()).collect();
            diagram.push(format!("  {}{} --> {}", state, marker, targets.join(", ")));
        }

        diagram.join("\n")
    }
}
