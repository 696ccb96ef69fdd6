//! Track map and coordinate conversion

pub mod waypoint_map;
pub mod frenet;
pub mod synthetic;

pub use waypoint_map::{Waypoint, WaypointMap};
pub use frenet::CoordinateTransform;
