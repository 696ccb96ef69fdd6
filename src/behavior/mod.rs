//! Behaviour planning: lane-level decision making

pub mod scene;
pub mod cost_functions;
pub mod state_machine;

pub use scene::{Candidate, Scene};
pub use cost_functions::{default_cost_functions, CenterLaneCost, CollisionCost, EfficiencyCost, LaneChangeCost};
pub use state_machine::{BehaviorPlanner, BehaviorState, Intent};
