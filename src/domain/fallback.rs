// Rule-based risk scoring used whenever the prediction service is unavailable
use super::prediction::{Prediction, PredictionSource, RiskLevel};
use super::telemetry::DeviceReading;
use chrono::{DateTime, Utc};

pub const FALLBACK_MODEL_VERSION: &str = "Fallback Model v1.0";
pub const FALLBACK_CONFIDENCE: f64 = 0.75;
pub const NORMAL_RANGES_FACTOR: &str = "All parameters within normal ranges";

/// Score a reading from its telemetry alone.
///
/// Contributions are summed in tenths so the label thresholds compare exactly.
pub fn fallback_prediction(reading: &DeviceReading, now: DateTime<Utc>) -> Prediction {
    let mut tenths: u32 = 0;
    let mut factors = Vec::new();

    if reading.temperature > 35.0 {
        tenths += 3;
        factors.push(format!("High temperature ({:.1}°C)", reading.temperature));
    }
    if reading.vibration > 0.8 {
        tenths += 2;
        factors.push(format!("Excessive vibration ({:.2})", reading.vibration));
    }
    if reading.error_logs > 15 {
        tenths += 2;
        factors.push(format!("High error count ({})", reading.error_logs));
    }
    if reading.runtime_hours > 8000.0 {
        tenths += 2;
        factors.push(format!("Extended runtime ({:.0} hours)", reading.runtime_hours));
    }
    if reading.repairs > 5 {
        tenths += 1;
        factors.push(format!("Frequent repairs ({})", reading.repairs));
    }

    if factors.is_empty() {
        factors.push(NORMAL_RANGES_FACTOR.to_string());
    }

    let label = match tenths {
        t if t >= 6 => RiskLevel::High,
        t if t >= 3 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    };

    Prediction {
        label,
        confidence: FALLBACK_CONFIDENCE,
        risk_score: f64::from(tenths) / 10.0,
        factors,
        model_version: FALLBACK_MODEL_VERSION.to_string(),
        source: PredictionSource::Fallback,
        timestamp: now,
    }
}
