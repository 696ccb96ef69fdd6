//! Short-horizon prediction of surrounding traffic

pub mod sensor_fusion;
pub mod model;

pub use sensor_fusion::SensorFusionRecord;
pub use model::{PredictionModel, Predictions, TrackedVehicle};
