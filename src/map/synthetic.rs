//! Generated tracks
//!
//! Used by the simulator when no map file is given, and by tests that need
//! geometry with a known closed form.

use super::waypoint_map::{Waypoint, WaypointMap};
use crate::common::{PlanningError, PlanningResult};
use std::f64::consts::PI;

/// Counter-clockwise circle of `n` waypoints around the origin
///
/// The lateral normal points outward (to the right of travel), and s is the
/// cumulative chord length, so the polygon and its s values agree exactly.
pub fn circular_track(radius: f64, n: usize) -> PlanningResult<WaypointMap> {
    if !(radius > 0.0) || n < 3 {
        return Err(PlanningError::InvalidMap(format!(
            "circular track needs radius > 0 and at least 3 waypoints, got {} and {}", radius, n
        )));
    }
    let chord = 2.0 * radius * (PI / n as f64).sin();
    let waypoints = (0..n)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / n as f64;
            Waypoint::new(
                radius * theta.cos(),
                radius * theta.sin(),
                chord * i as f64,
                theta.cos(),
                theta.sin(),
            )
        })
        .collect();
    WaypointMap::new(waypoints)
}

/// Straight track along +x starting at the origin, normal pointing to -y
///
/// The closing segment runs back over the track, so only s in
/// [0, (n - 1) * spacing] is meaningful.
pub fn straight_track(n: usize, spacing: f64) -> PlanningResult<WaypointMap> {
    if !(spacing > 0.0) || n < 2 {
        return Err(PlanningError::InvalidMap(format!(
            "straight track needs spacing > 0 and at least 2 waypoints, got {} and {}", spacing, n
        )));
    }
    let waypoints = (0..n)
        .map(|i| {
            let s = spacing * i as f64;
            Waypoint::new(s, 0.0, s, 0.0, -1.0)
        })
        .collect();
    WaypointMap::new(waypoints)
}
