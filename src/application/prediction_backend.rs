// Backend trait for the external risk-prediction service
use crate::domain::prediction::Prediction;
use crate::domain::telemetry::DeviceReading;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// No response was obtained (connect failure, timeout, broken body)
    #[error("prediction service unreachable: {0}")]
    Transport(String),

    #[error("prediction service returned status {0}")]
    Status(u16),

    #[error("malformed prediction response: {0}")]
    Malformed(String),
}

impl GatewayError {
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}

/// Model information reported by the status endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ModelStatus {
    pub model_loaded: bool,
    pub model_version: Option<String>,
}

#[async_trait]
pub trait PredictionBackend: Send + Sync {
    /// Score a single device
    async fn predict(&self, reading: &DeviceReading) -> Result<Prediction, GatewayError>;

    /// Score many devices in one round trip; results are in request order
    async fn predict_batch(&self, readings: &[DeviceReading]) -> Result<Vec<Prediction>, GatewayError>;

    /// Cheap health probe
    async fn status(&self) -> Result<ModelStatus, GatewayError>;
}
