// Prediction gateway - always yields a usable prediction
use crate::application::prediction_backend::{GatewayError, PredictionBackend};
use crate::domain::fallback::fallback_prediction;
use crate::domain::prediction::{ApiStatus, Prediction};
use crate::domain::telemetry::DeviceReading;
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct PredictionGateway {
    backend: Arc<dyn PredictionBackend>,
}

impl PredictionGateway {
    pub fn new(backend: Arc<dyn PredictionBackend>) -> Self {
        Self { backend }
    }

    /// Score one device; any failure falls back to the rule engine.
    pub async fn predict_one(&self, reading: &DeviceReading) -> Prediction {
        match self.backend.predict(reading).await {
            Ok(prediction) => prediction,
            Err(e) => {
                tracing::warn!(device = %reading.device_name, error = %e, "prediction failed, using fallback");
                fallback_prediction(reading, Utc::now())
            }
        }
    }

    /// Score many devices; any failure falls back per device.
    pub async fn predict_batch(&self, readings: &[DeviceReading]) -> Vec<Prediction> {
        match self.try_predict_batch(readings).await {
            Ok(predictions) => predictions,
            Err(e) => {
                tracing::warn!(devices = readings.len(), error = %e, "batch prediction failed, using fallback");
                fallback_all(readings)
            }
        }
    }

    /// Like [`predict_batch`](Self::predict_batch), but transport failures are
    /// returned so the caller can pick its own degraded path. Error responses
    /// and malformed bodies still fall back here.
    pub async fn try_predict_batch(&self, readings: &[DeviceReading]) -> Result<Vec<Prediction>, GatewayError> {
        if readings.is_empty() {
            return Ok(Vec::new());
        }

        match self.backend.predict_batch(readings).await {
            Ok(predictions) if predictions.len() == readings.len() => Ok(predictions),
            Ok(predictions) => {
                tracing::warn!(
                    expected = readings.len(),
                    received = predictions.len(),
                    "batch response size mismatch, using fallback"
                );
                Ok(fallback_all(readings))
            }
            Err(e) if e.is_transport() => Err(e),
            Err(e) => {
                tracing::warn!(devices = readings.len(), error = %e, "batch prediction rejected, using fallback");
                Ok(fallback_all(readings))
            }
        }
    }

    pub async fn check_status(&self) -> ApiStatus {
        let now = Utc::now();
        match self.backend.status().await {
            Ok(status) => ApiStatus::connected(status.model_loaded, status.model_version, now),
            Err(e) => {
                tracing::debug!(error = %e, "status probe failed");
                ApiStatus::disconnected(e.to_string(), now)
            }
        }
    }
}

fn fallback_all(readings: &[DeviceReading]) -> Vec<Prediction> {
    let now = Utc::now();
    readings.iter().map(|r| fallback_prediction(r, now)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{reading, FakeBackend, Mode};
    use crate::domain::fallback::FALLBACK_MODEL_VERSION;
    use crate::domain::prediction::PredictionSource;

    #[tokio::test]
    async fn test_predict_one_falls_back_on_any_error() {
        for mode in [Mode::Unreachable, Mode::ServerError, Mode::Malformed] {
            let gateway = PredictionGateway::new(Arc::new(FakeBackend::new(mode)));
            let prediction = gateway.predict_one(&reading("Alaris GH", 40.0)).await;
            assert_eq!(prediction.model_version, FALLBACK_MODEL_VERSION);
            assert_eq!(prediction.source, PredictionSource::Fallback);
        }
    }

    #[tokio::test]
    async fn test_predict_one_passes_through_api_result() {
        let gateway = PredictionGateway::new(Arc::new(FakeBackend::new(Mode::Healthy)));
        let prediction = gateway.predict_one(&reading("Alaris GH", 40.0)).await;
        assert_eq!(prediction.source, PredictionSource::Api);
    }

    #[tokio::test]
    async fn test_try_predict_batch_surfaces_only_transport_failures() {
        let readings = vec![reading("Alaris GH", 40.0), reading("GE Aisys", 25.0)];

        let unreachable = PredictionGateway::new(Arc::new(FakeBackend::new(Mode::Unreachable)));
        assert!(unreachable.try_predict_batch(&readings).await.is_err());

        let failing = PredictionGateway::new(Arc::new(FakeBackend::new(Mode::ServerError)));
        let predictions = failing.try_predict_batch(&readings).await.unwrap();
        assert_eq!(predictions.len(), 2);
        assert!(predictions.iter().all(Prediction::is_fallback));
    }

    #[tokio::test]
    async fn test_predict_batch_never_fails() {
        let readings = vec![reading("Alaris GH", 40.0), reading("GE Aisys", 25.0)];
        let gateway = PredictionGateway::new(Arc::new(FakeBackend::new(Mode::Unreachable)));
        let predictions = gateway.predict_batch(&readings).await;
        assert_eq!(predictions.len(), 2);
        assert!(predictions.iter().all(Prediction::is_fallback));
    }

    #[tokio::test]
    async fn test_short_batch_response_falls_back() {
        let readings = vec![reading("Alaris GH", 40.0), reading("GE Aisys", 25.0)];
        let gateway = PredictionGateway::new(Arc::new(FakeBackend::new(Mode::ShortBatch)));
        let predictions = gateway.predict_batch(&readings).await;
        assert_eq!(predictions.len(), 2);
        assert!(predictions.iter().all(Prediction::is_fallback));
    }

    #[tokio::test]
    async fn test_check_status() {
        let healthy = PredictionGateway::new(Arc::new(FakeBackend::new(Mode::Healthy)));
        let status = healthy.check_status().await;
        assert!(status.connected);
        assert!(status.model_loaded);

        let down = PredictionGateway::new(Arc::new(FakeBackend::new(Mode::Unreachable)));
        let status = down.check_status().await;
        assert!(!status.connected);
        assert!(status.error.is_some());
        assert!(status.last_check.is_some());
    }
}
