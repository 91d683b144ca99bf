// Telemetry domain models and their clamp ranges
use serde::{Deserialize, Serialize};

/// Inclusive clamp range for one telemetry channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const TEMPERATURE_RANGE: Range = Range::new(15.0, 45.0);
pub const VIBRATION_RANGE: Range = Range::new(0.0, 1.2);
pub const PRESSURE_RANGE: Range = Range::new(50.0, 250.0);
pub const CURRENT_DRAW_RANGE: Range = Range::new(1.0, 15.0);
pub const MAX_ERROR_LOGS: u32 = 50;

/// Mutable sensor readings of a simulated device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Degrees Celsius
    pub temperature: f64,
    pub vibration: f64,
    pub error_logs: u32,
    pub runtime_hours: f64,
    pub pressure: f64,
    /// Amperes
    pub current_draw: f64,
}

impl Telemetry {
    /// Force every channel back into its declared range.
    pub fn clamp(&mut self) {
        self.temperature = TEMPERATURE_RANGE.clamp(self.temperature);
        self.vibration = VIBRATION_RANGE.clamp(self.vibration);
        self.error_logs = self.error_logs.min(MAX_ERROR_LOGS);
        self.runtime_hours = self.runtime_hours.max(0.0);
        self.pressure = PRESSURE_RANGE.clamp(self.pressure);
        self.current_draw = CURRENT_DRAW_RANGE.clamp(self.current_draw);
    }

    pub fn is_within_bounds(&self) -> bool {
        TEMPERATURE_RANGE.contains(self.temperature)
            && VIBRATION_RANGE.contains(self.vibration)
            && self.error_logs <= MAX_ERROR_LOGS
            && self.runtime_hours >= 0.0
            && PRESSURE_RANGE.contains(self.pressure)
            && CURRENT_DRAW_RANGE.contains(self.current_draw)
    }
}

/// Telemetry payload scored by the prediction service.
///
/// Field names follow the `/predict` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    pub device_name: String,
    pub temperature: f64,
    pub vibration: f64,
    pub error_logs: u32,
    pub runtime_hours: f64,
    pub device_age: f64,
    pub repairs: u32,
    pub pressure: f64,
    pub current_draw: f64,
    pub location: String,
}
