// Domain layer - Pure data models and rules
pub mod alert;
pub mod chart;
pub mod dashboard;
pub mod device;
pub mod fallback;
pub mod fleet;
pub mod prediction;
pub mod telemetry;
