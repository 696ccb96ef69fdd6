//! Raw sensor fusion observations

use serde::Deserialize;

/// One observed vehicle as reported by sensor fusion
///
/// On the wire this is a 7-element array `[id, x, y, vx, vy, s, d]`.
/// The reported s and d are kept for logging only; the planner derives
/// its own Frenet coordinates from x and y.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 7]")]
pub struct SensorFusionRecord {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub s: f64,
    pub d: f64,
}

impl SensorFusionRecord {
    pub fn new(id: u32, x: f64, y: f64, vx: f64, vy: f64) -> Self {
        SensorFusionRecord { id, x, y, vx, vy, s: 0.0, d: 0.0 }
    }

    pub fn speed(&self) -> f64 {
        (self.vx.powi(2) + self.vy.powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.vx, self.vy].iter().all(|v| v.is_finite())
    }
}

impl From<[f64; 7]> for SensorFusionRecord {
    fn from(raw: [f64; 7]) -> Self {
        SensorFusionRecord {
            id: raw[0] as u32,
            x: raw[1],
            y: raw[2],
            vx: raw[3],
            vy: raw[4],
            s: raw[5],
            d: raw[6],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_array() {
        let record = SensorFusionRecord::from([4.0, 10.0, 20.0, 3.0, 4.0, 100.0, 6.0]);
        assert_eq!(record.id, 4);
        assert!((record.speed() - 5.0).abs() < 1e-12);
        assert_eq!(record.d, 6.0);
    }

    #[test]
    fn test_deserialize_array() {
        let records: Vec<SensorFusionRecord> =
            serde_json::from_str("[[1, 2.5, 3.5, 0, 0, 10, 2]]").unwrap();
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].x, 2.5);
    }
}
