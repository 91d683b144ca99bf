// Test doubles for the prediction backend
use crate::application::prediction_backend::{GatewayError, ModelStatus, PredictionBackend};
use crate::domain::fallback::fallback_prediction;
use crate::domain::prediction::{Prediction, PredictionSource};
use crate::domain::telemetry::DeviceReading;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Healthy,
    Unreachable,
    ServerError,
    Malformed,
    ShortBatch,
}

pub struct FakeBackend {
    mode: Mode,
    pub single_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    batch_latency: Duration,
}

impl FakeBackend {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            single_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            batch_latency: Duration::ZERO,
        }
    }

    /// Batch calls take `latency` before answering
    pub fn with_batch_latency(mode: Mode, latency: Duration) -> Self {
        Self {
            batch_latency: latency,
            ..Self::new(mode)
        }
    }

    fn failure(&self) -> Option<GatewayError> {
        match self.mode {
            Mode::Unreachable => Some(GatewayError::Transport("connection refused".to_string())),
            Mode::ServerError => Some(GatewayError::Status(500)),
            Mode::Malformed => Some(GatewayError::Malformed("missing prediction".to_string())),
            Mode::Healthy | Mode::ShortBatch => None,
        }
    }
}

/// Rule-engine scores relabelled as if the service had produced them
pub fn api_prediction(reading: &DeviceReading) -> Prediction {
    let mut prediction = fallback_prediction(reading, Utc::now());
    prediction.source = PredictionSource::Api;
    prediction.model_version = "xgboost-test v2".to_string();
    prediction.confidence = 0.9;
    prediction
}

#[async_trait]
impl PredictionBackend for FakeBackend {
    async fn predict(&self, reading: &DeviceReading) -> Result<Prediction, GatewayError> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        match self.failure() {
            Some(e) => Err(e),
            None => Ok(api_prediction(reading)),
        }
    }

    async fn predict_batch(&self, readings: &[DeviceReading]) -> Result<Vec<Prediction>, GatewayError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if !self.batch_latency.is_zero() {
            tokio::time::sleep(self.batch_latency).await;
        }
        if let Some(e) = self.failure() {
            return Err(e);
        }
        let mut predictions: Vec<Prediction> = readings.iter().map(api_prediction).collect();
        if self.mode == Mode::ShortBatch {
            predictions.pop();
        }
        Ok(predictions)
    }

    async fn status(&self) -> Result<ModelStatus, GatewayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.failure() {
            Some(e) => Err(e),
            None => Ok(ModelStatus {
                model_loaded: true,
                model_version: Some("xgboost-test v2".to_string()),
            }),
        }
    }
}

pub fn reading(device_name: &str, temperature: f64) -> DeviceReading {
    DeviceReading {
        device_name: device_name.to_string(),
        temperature,
        vibration: 0.3,
        error_logs: 4,
        runtime_hours: 3000.0,
        device_age: 2.5,
        repairs: 1,
        pressure: 120.0,
        current_draw: 5.0,
        location: "Hospital A - ICU".to_string(),
    }
}
