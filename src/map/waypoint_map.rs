//! Track waypoint map
//!
//! An immutable, cyclic sequence of centerline samples. Loaded once and
//! shared read-only for the lifetime of the planner.

use crate::common::{PlanningError, PlanningResult, Point2D};
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

/// Allowed deviation of a stored lateral normal from unit length
const NORMAL_LENGTH_TOLERANCE: f64 = 0.05;

/// A sampled centerline point and the lateral unit normal at it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
    /// Cumulative distance along the track (m)
    pub s: f64,
    /// Lateral unit normal, pointing toward increasing d
    pub dx: f64,
    pub dy: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, s: f64, dx: f64, dy: f64) -> Self {
        Waypoint { x, y, s, dx, dy }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    fn is_finite(&self) -> bool {
        [self.x, self.y, self.s, self.dx, self.dy].iter().all(|v| v.is_finite())
    }

    fn normal_length(&self) -> f64 {
        (self.dx.powi(2) + self.dy.powi(2)).sqrt()
    }
}

/// Cyclic waypoint map
#[derive(Debug, Clone)]
pub struct WaypointMap {
    waypoints: Vec<Waypoint>,
    max_s: f64,
}

impl WaypointMap {
    /// Build a map, deriving the track length from the closing segment
    ///
    /// The waypoints may start anywhere on the loop: a single descent in s
    /// is treated as the wrap point and the sequence is rotated so that s
    /// increases from the first element.
    pub fn new(waypoints: Vec<Waypoint>) -> PlanningResult<Self> {
        let waypoints = Self::validated(waypoints)?;
        let first = waypoints[0];
        let last = waypoints[waypoints.len() - 1];
        let max_s = last.s - first.s + last.position().distance(&first.position());
        Ok(WaypointMap { waypoints, max_s })
    }

    /// Build a map with an externally known track length
    pub fn with_max_s(waypoints: Vec<Waypoint>, max_s: f64) -> PlanningResult<Self> {
        let waypoints = Self::validated(waypoints)?;
        let span = waypoints[waypoints.len() - 1].s - waypoints[0].s;
        if !(max_s > span) {
            return Err(PlanningError::InvalidMap(format!(
                "max_s {} does not exceed waypoint span {}", max_s, span
            )));
        }
        Ok(WaypointMap { waypoints, max_s })
    }

    fn validated(mut waypoints: Vec<Waypoint>) -> PlanningResult<Vec<Waypoint>> {
        if waypoints.len() < 2 {
            return Err(PlanningError::InvalidMap(format!(
                "need at least 2 waypoints, got {}", waypoints.len()
            )));
        }
        for (i, wp) in waypoints.iter().enumerate() {
            if !wp.is_finite() {
                return Err(PlanningError::InvalidMap(format!("waypoint {} is not finite", i)));
            }
            if (wp.normal_length() - 1.0).abs() > NORMAL_LENGTH_TOLERANCE {
                return Err(PlanningError::InvalidMap(format!(
                    "waypoint {} normal has length {:.3}", i, wp.normal_length()
                )));
            }
        }

        let descents: Vec<usize> = (1..waypoints.len())
            .filter(|&i| waypoints[i].s <= waypoints[i - 1].s)
            .collect();
        match descents.as_slice() {
            [] => {}
            [wrap] if waypoints[waypoints.len() - 1].s < waypoints[0].s => {
                debug!("rotating waypoint map to start at index {}", wrap);
                waypoints.rotate_left(*wrap);
            }
            _ => {
                return Err(PlanningError::InvalidMap(
                    "waypoint s values are not increasing".to_string(),
                ));
            }
        }
        Ok(waypoints)
    }

    /// Parse the whitespace separated `x y s dx dy` format, one waypoint per line
    pub fn from_reader<R: BufRead>(reader: R) -> PlanningResult<Self> {
        let mut waypoints = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields = trimmed
                .split_whitespace()
                .map(|f| f.parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|e| PlanningError::InvalidMap(format!("line {}: {}", line_no + 1, e)))?;
            match fields.as_slice() {
                [x, y, s, dx, dy] => waypoints.push(Waypoint::new(*x, *y, *s, *dx, *dy)),
                _ => {
                    return Err(PlanningError::InvalidMap(format!(
                        "line {}: expected 5 fields, got {}", line_no + 1, fields.len()
                    )));
                }
            }
        }
        Self::new(waypoints)
    }

    /// Load a map file from disk
    pub fn load(path: &Path) -> PlanningResult<Self> {
        let file = std::fs::File::open(path)?;
        let map = Self::from_reader(std::io::BufReader::new(file))?;
        info!("Loaded {} waypoints from {:?}, track length {:.3} m", map.len(), path, map.max_s);
        Ok(map)
    }

    /// Replace the derived track length
    pub fn set_max_s(self, max_s: f64) -> PlanningResult<Self> {
        Self::with_max_s(self.waypoints, max_s)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Track length; s wraps to the first waypoint's s after this distance
    pub fn max_s(&self) -> f64 {
        self.max_s
    }

    pub fn get(&self, index: usize) -> &Waypoint {
        &self.waypoints[index % self.waypoints.len()]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Waypoint> {
        self.waypoints.iter()
    }

    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.waypoints.len()
    }

    pub fn prev_index(&self, index: usize) -> usize {
        (index + self.waypoints.len() - 1) % self.waypoints.len()
    }

    /// Bring any s into [first s, first s + max_s)
    pub fn normalize_s(&self, s: f64) -> f64 {
        let s0 = self.waypoints[0].s;
        s0 + (s - s0).rem_euclid(self.max_s)
    }

    /// Signed shortest distance along the loop from `from` to `to`
    pub fn s_difference(&self, from: f64, to: f64) -> f64 {
        let half = self.max_s / 2.0;
        (to - from + half).rem_euclid(self.max_s) - half
    }

    /// Index of the waypoint that starts the segment containing `s`
    ///
    /// The segment starting at the last waypoint is the closing segment back
    /// to the first one.
    pub fn segment_containing(&self, s: f64) -> usize {
        let s = self.normalize_s(s);
        let after = self.waypoints.partition_point(|wp| wp.s <= s);
        after.saturating_sub(1)
    }

    /// s at which the segment starting at `index` ends, unwrapped past max_s
    pub fn segment_end_s(&self, index: usize) -> f64 {
        let index = index % self.waypoints.len();
        if index + 1 < self.waypoints.len() {
            self.waypoints[index + 1].s
        } else {
            self.waypoints[0].s + self.max_s
        }
    }
}
