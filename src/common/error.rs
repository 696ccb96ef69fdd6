//! Error types for highway_planner

use thiserror::Error;

/// Main error type for the planning core
#[derive(Error, Debug)]
pub enum PlanningError {
    /// Telemetry or wire input could not be used; the cycle is skipped
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Interpolation or curve fitting has no well-defined result
    #[error("Degenerate geometry: {0}")]
    GeometryDegenerate(String),

    /// Waypoint map rejected at load time
    #[error("Invalid map: {0}")]
    InvalidMap(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for PlanningError {
    fn from(e: toml::de::Error) -> Self {
        PlanningError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for PlanningError {
    fn from(e: serde_json::Error) -> Self {
        PlanningError::MalformedInput(e.to_string())
    }
}

/// Result type alias for planning operations
pub type PlanningResult<T> = Result<T, PlanningError>;
