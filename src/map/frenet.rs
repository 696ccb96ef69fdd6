//! Conversion between world Cartesian coordinates and track Frenet coordinates
//!
//! The centerline is the piecewise-linear loop through the map waypoints.
//! `to_frenet` projects onto the segment ending at the next waypoint ahead
//! of the vehicle; `to_cartesian` interpolates both the centerline point and
//! the lateral normal inside the segment that brackets `s`.

use super::waypoint_map::WaypointMap;
use crate::common::{normalize_angle, FrenetPoint, Point2D};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

/// Segments shorter than this are treated as a single point
const MIN_SEGMENT_LENGTH: f64 = 1e-9;

/// Frenet <-> Cartesian transform over a shared waypoint map
#[derive(Debug, Clone)]
pub struct CoordinateTransform {
    map: Arc<WaypointMap>,
}

impl CoordinateTransform {
    pub fn new(map: Arc<WaypointMap>) -> Self {
        CoordinateTransform { map }
    }

    pub fn map(&self) -> &WaypointMap {
        &self.map
    }

    /// Track length
    pub fn max_s(&self) -> f64 {
        self.map.max_s()
    }

    /// Index of the waypoint nearest to (x, y); the first one wins a tie
    pub fn closest_waypoint(&self, x: f64, y: f64) -> usize {
        self.map
            .iter()
            .position_min_by_key(|wp| OrderedFloat((wp.x - x).powi(2) + (wp.y - y).powi(2)))
            .unwrap_or(0)
    }

    /// Index of the first waypoint ahead of a vehicle at (x, y) facing `heading`
    pub fn next_waypoint(&self, x: f64, y: f64, heading: f64) -> usize {
        let closest = self.closest_waypoint(x, y);
        let wp = self.map.get(closest);
        let bearing = (wp.y - y).atan2(wp.x - x);
        let angle = normalize_angle(heading - bearing).abs();
        if angle > FRAC_PI_2 {
            self.map.next_index(closest)
        } else {
            closest
        }
    }

    /// Project a world pose onto the track
    pub fn to_frenet(&self, x: f64, y: f64, heading: f64) -> FrenetPoint {
        let next = self.next_waypoint(x, y, heading);
        let prev = self.map.prev_index(next);
        let a = self.map.get(prev);
        let b = self.map.get(next);

        let (nx, ny) = (b.x - a.x, b.y - a.y);
        let (vx, vy) = (x - a.x, y - a.y);
        let length = (nx * nx + ny * ny).sqrt();
        let normal = ((a.dx + b.dx) / 2.0, (a.dy + b.dy) / 2.0);

        if length < MIN_SEGMENT_LENGTH {
            let d = vx * normal.0 + vy * normal.1;
            return FrenetPoint::new(self.map.normalize_s(a.s), d);
        }

        let along = (vx * nx + vy * ny) / length;
        let (foot_x, foot_y) = (a.x + nx * along / length, a.y + ny * along / length);
        let (off_x, off_y) = (x - foot_x, y - foot_y);
        let distance = (off_x * off_x + off_y * off_y).sqrt();
        let side = off_x * normal.0 + off_y * normal.1;
        let d = if side < 0.0 { -distance } else { distance };

        // scale so that the segment's Cartesian length maps onto its s span
        let s_span = self.map.segment_end_s(prev) - a.s;
        let s = a.s + along / length * s_span;
        FrenetPoint::new(self.map.normalize_s(s), d)
    }

    /// World position of a Frenet coordinate; s wraps around the track
    pub fn to_cartesian(&self, s: f64, d: f64) -> Point2D {
        let s = self.map.normalize_s(s);
        let i = self.map.segment_containing(s);
        let a = self.map.get(i);
        let b = self.map.get(self.map.next_index(i));

        let s_span = self.map.segment_end_s(i) - a.s;
        let t = if s_span > 0.0 { ((s - a.s) / s_span).clamp(0.0, 1.0) } else { 0.0 };

        let center_x = a.x + t * (b.x - a.x);
        let center_y = a.y + t * (b.y - a.y);

        let mut dx = a.dx + t * (b.dx - a.dx);
        let mut dy = a.dy + t * (b.dy - a.dy);
        let norm = (dx * dx + dy * dy).sqrt();
        if norm > MIN_SEGMENT_LENGTH {
            dx /= norm;
            dy /= norm;
        } else {
            dx = a.dx;
            dy = a.dy;
        }

        Point2D::new(center_x + d * dx, center_y + d * dy)
    }

    /// Direction of travel of the centerline segment containing `s`
    pub fn track_heading(&self, s: f64) -> f64 {
        let i = self.map.segment_containing(s);
        let a = self.map.get(i);
        let b = self.map.get(self.map.next_index(i));
        a.position().heading_to(&b.position())
    }
}
