//! Wire messages exchanged with the simulator bridge
//!
//! Frames are socket.io style text messages: `42["telemetry",{...}]` in,
//! `42["control",{...}]` or `42["manual",{}]` out.

use crate::common::{Path2D, PlanningError, PlanningResult, Point2D, MPH_TO_MPS};
use crate::prediction::SensorFusionRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reply sent when the simulator is driven manually
pub const MANUAL_FRAME: &str = "42[\"manual\",{}]";

/// Per-cycle localization and environment report
#[derive(Debug, Clone, Deserialize)]
pub struct Telemetry {
    pub x: f64,
    pub y: f64,
    pub s: f64,
    pub d: f64,
    /// Heading in degrees
    pub yaw: f64,
    /// Speed in miles per hour
    pub speed: f64,
    /// Unconsumed points of the previously sent path
    pub previous_path_x: Vec<f64>,
    pub previous_path_y: Vec<f64>,
    /// Frenet coordinates of the last unconsumed point
    pub end_path_s: f64,
    pub end_path_d: f64,
    pub sensor_fusion: Vec<SensorFusionRecord>,
}

impl Telemetry {
    /// Speed in meters per second
    pub fn speed_mps(&self) -> f64 {
        self.speed * MPH_TO_MPS
    }

    /// Heading in radians
    pub fn yaw_rad(&self) -> f64 {
        self.yaw.to_radians()
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Unconsumed tail of the previous path
    pub fn previous_path(&self) -> Path2D {
        self.previous_path_x.iter()
            .zip(self.previous_path_y.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
            .collect::<Vec<_>>()
            .into()
    }

    /// Reject reports the planner cannot use
    pub fn validate(&self) -> PlanningResult<()> {
        let scalars = [
            ("x", self.x),
            ("y", self.y),
            ("s", self.s),
            ("d", self.d),
            ("yaw", self.yaw),
            ("speed", self.speed),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(PlanningError::MalformedInput(format!("{} is not finite", name)));
            }
        }
        if self.previous_path_x.len() != self.previous_path_y.len() {
            return Err(PlanningError::MalformedInput(format!(
                "previous path has {} x values but {} y values",
                self.previous_path_x.len(),
                self.previous_path_y.len()
            )));
        }
        if !self.previous_path().points.iter().all(|p| p.is_finite()) {
            return Err(PlanningError::MalformedInput("previous path is not finite".to_string()));
        }
        if !self.previous_path_x.is_empty() && !(self.end_path_s.is_finite() && self.end_path_d.is_finite()) {
            return Err(PlanningError::MalformedInput("end of path is not finite".to_string()));
        }
        if let Some(bad) = self.sensor_fusion.iter().find(|r| !r.is_finite()) {
            return Err(PlanningError::MalformedInput(format!(
                "sensor fusion record {} is not finite", bad.id
            )));
        }
        Ok(())
    }
}

/// Planned path in the simulator's parallel-array layout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryMessage {
    pub next_x: Vec<f64>,
    pub next_y: Vec<f64>,
}

impl From<&Path2D> for TrajectoryMessage {
    fn from(path: &Path2D) -> Self {
        TrajectoryMessage {
            next_x: path.x_coords(),
            next_y: path.y_coords(),
        }
    }
}

/// Decoded inbound frame
#[derive(Debug, Clone)]
pub enum SocketEvent {
    Telemetry(Box<Telemetry>),
    /// No autonomous data; answer with `MANUAL_FRAME`
    Manual,
    /// Any other named event
    Other(String),
}

/// Decode a text frame; `Ok(None)` for frames that are not event messages
pub fn parse_frame(frame: &str) -> PlanningResult<Option<SocketEvent>> {
    // "4" = message, "2" = event
    if frame.len() <= 2 || !frame.starts_with("42") {
        return Ok(None);
    }
    if frame.contains("null") {
        return Ok(Some(SocketEvent::Manual));
    }
    let (start, end) = match (frame.find('['), frame.rfind(']')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Ok(Some(SocketEvent::Manual)),
    };

    let payload: Value = serde_json::from_str(&frame[start..=end])?;
    let event = payload.get(0)
        .and_then(Value::as_str)
        .ok_or_else(|| PlanningError::MalformedInput("event name missing".to_string()))?;
    if event != "telemetry" {
        return Ok(Some(SocketEvent::Other(event.to_string())));
    }

    let body = payload.get(1)
        .cloned()
        .ok_or_else(|| PlanningError::MalformedInput("telemetry body missing".to_string()))?;
    let telemetry: Telemetry = serde_json::from_value(body)?;
    telemetry.validate()?;
    Ok(Some(SocketEvent::Telemetry(Box::new(telemetry))))
}

/// Encode a planned path as a control frame
pub fn control_frame(path: &Path2D) -> PlanningResult<String> {
    let body = serde_json::to_string(&TrajectoryMessage::from(path))
        .map_err(|e| PlanningError::MalformedInput(e.to_string()))?;
    Ok(format!("42[\"control\",{}]", body))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: &str = r#"42["telemetry",{"x":909.48,"y":1128.67,"yaw":0,"speed":0,"s":124.834,"d":6.16483,"previous_path_x":[],"previous_path_y":[],"end_path_s":0,"end_path_d":0,"sensor_fusion":[[0,1092.2,1147.1,18.9,0.2,306.0,6.06],[1,775.8,1421.6,0,0,6719.2,-280.2]]}]"#;

    #[test]
    fn test_parse_telemetry_frame() {
        let event = parse_frame(FRAME).unwrap().unwrap();
        let telemetry = match event {
            SocketEvent::Telemetry(t) => t,
            other => panic!("unexpected event {:?}", other),
        };
        assert!((telemetry.s - 124.834).abs() < 1e-9);
        assert_eq!(telemetry.sensor_fusion.len(), 2);
        assert_eq!(telemetry.sensor_fusion[1].id, 1);
        assert!((telemetry.sensor_fusion[0].vx - 18.9).abs() < 1e-9);
        assert!(telemetry.previous_path().is_empty());
    }

    #[test]
    fn test_manual_and_foreign_frames() {
        assert!(matches!(parse_frame("42[\"telemetry\",null]").unwrap(), Some(SocketEvent::Manual)));
        assert!(parse_frame("2").unwrap().is_none());
        assert!(parse_frame("40").unwrap().is_none());
        assert!(matches!(
            parse_frame("42[\"ping\",{}]").unwrap(),
            Some(SocketEvent::Other(name)) if name == "ping"
        ));
    }

    #[test]
    fn test_incomplete_telemetry_is_malformed() {
        let err = parse_frame(r#"42["telemetry",{"x":1.0,"y":2.0}]"#).unwrap_err();
        assert!(matches!(err, PlanningError::MalformedInput(_)));
    }

    #[test]
    fn test_mismatched_previous_path_is_malformed() {
        let frame = FRAME.replace(r#""previous_path_x":[]"#, r#""previous_path_x":[1.0]"#);
        let err = parse_frame(&frame).unwrap_err();
        assert!(matches!(err, PlanningError::MalformedInput(_)));
    }

    #[test]
    fn test_control_frame() {
        let path = Path2D::from_xy(&[1.0, 2.5], &[3.0, 4.0]).unwrap();
        let frame = control_frame(&path).unwrap();
        assert_eq!(frame, "42[\"control\",{\"next_x\":[1.0,2.5],\"next_y\":[3.0,4.0]}]");
    }

    #[test]
    fn test_unit_conversions() {
        let event = parse_frame(&FRAME.replace(r#""speed":0"#, r#""speed":50"#)).unwrap().unwrap();
        if let SocketEvent::Telemetry(t) = event {
            assert!((t.speed_mps() - 22.352).abs() < 1e-9);
            assert_eq!(t.yaw_rad(), 0.0);
        } else {
            panic!("expected telemetry");
        }
    }
}
