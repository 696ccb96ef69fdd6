//! Common types used throughout highway_planner

use nalgebra::{Isometry2, Point2, Vector2};

/// Wrap an angle into [-pi, pi]
pub fn normalize_angle(angle: f64) -> f64 {
    angle.sin().atan2(angle.cos())
}

/// Miles per hour to meters per second
pub const MPH_TO_MPS: f64 = 0.44704;

/// 2D point in world (map) coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Heading of the vector from `self` to `other`
    pub fn heading_to(&self, other: &Point2D) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

impl From<Vector2<f64>> for Point2D {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

/// 2D pose (position + heading)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl Pose2D {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    fn isometry(&self) -> Isometry2<f64> {
        Isometry2::new(Vector2::new(self.x, self.y), self.yaw)
    }

    /// Express a world point in this pose's frame (x forward, y left)
    pub fn to_local(&self, p: &Point2D) -> Point2D {
        let local = self.isometry().inverse_transform_point(&Point2::new(p.x, p.y));
        Point2D::new(local.x, local.y)
    }

    /// Map a point in this pose's frame back to world coordinates
    pub fn to_world(&self, p: &Point2D) -> Point2D {
        let world = self.isometry().transform_point(&Point2::new(p.x, p.y));
        Point2D::new(world.x, world.y)
    }

    /// Normalize yaw to [-pi, pi]
    pub fn normalize_yaw(&mut self) {
        self.yaw = normalize_angle(self.yaw);
    }
}

/// Track-relative coordinates: distance along the centerline and signed lateral offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrenetPoint {
    pub s: f64,
    pub d: f64,
}

impl FrenetPoint {
    pub fn new(s: f64, d: f64) -> Self {
        Self { s, d }
    }
}

/// Path represented as a sequence of 2D points, one per control tick
#[derive(Debug, Clone, PartialEq)]
pub struct Path2D {
    pub points: Vec<Point2D>,
}

impl Path2D {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    /// Build from parallel coordinate sequences, which must be equally long
    pub fn from_xy(x: &[f64], y: &[f64]) -> Option<Self> {
        if x.len() != y.len() {
            return None;
        }
        let points = x.iter().zip(y.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
            .collect();
        Some(Self { points })
    }

    pub fn push(&mut self, point: Point2D) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&Point2D> {
        self.points.last()
    }

    pub fn x_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    /// Distances between consecutive points
    pub fn spacings(&self) -> Vec<f64> {
        self.points.windows(2)
            .map(|w| w[0].distance(&w[1]))
            .collect()
    }

    pub fn total_length(&self) -> f64 {
        self.spacings().iter().sum()
    }
}

impl From<Vec<Point2D>> for Path2D {
    fn from(points: Vec<Point2D>) -> Self {
        Path2D::from_points(points)
    }
}

impl Default for Path2D {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_point2d_distance() {
        let p1 = Point2D::new(0.0, 0.0);
        let p2 = Point2D::new(3.0, 4.0);
        assert!((p1.distance(&p2) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((normalize_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert!((normalize_angle(0.5) - 0.5).abs() < 1e-12);
        assert!((normalize_angle(PI) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_huge_angle() {
        for angle in [1.0e20, -1.0e20, f64::MAX] {
            let wrapped = normalize_angle(angle);
            assert!(wrapped.abs() <= PI, "{} wrapped to {}", angle, wrapped);
        }
    }

    #[test]
    fn test_pose2d_local_world_round_trip() {
        let pose = Pose2D::new(10.0, -4.0, 0.7);
        let p = Point2D::new(13.5, 2.25);
        let local = pose.to_local(&p);
        let back = pose.to_world(&local);
        assert!(back.distance(&p) < 1e-9);
    }

    #[test]
    fn test_pose2d_local_axes() {
        let pose = Pose2D::new(1.0, 1.0, PI / 2.0);
        // one meter "ahead" of a pose facing +y
        let local = pose.to_local(&Point2D::new(1.0, 2.0));
        assert!((local.x - 1.0).abs() < 1e-9);
        assert!(local.y.abs() < 1e-9);
    }

    #[test]
    fn test_path2d_from_xy_rejects_mismatch() {
        assert!(Path2D::from_xy(&[0.0, 1.0], &[0.0]).is_none());
    }

    #[test]
    fn test_path2d_total_length() {
        let path = Path2D::from_xy(&[0.0, 1.0, 1.0], &[0.0, 0.0, 1.0]).unwrap();
        assert!((path.total_length() - 2.0).abs() < 1e-10);
        assert_eq!(path.spacings().len(), 2);
    }
}
