// HTTP client for the external risk-prediction service
use crate::application::prediction_backend::{GatewayError, ModelStatus, PredictionBackend};
use crate::domain::prediction::{Prediction, PredictionSource, RiskLevel};
use crate::domain::telemetry::DeviceReading;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    devices: &'a [DeviceReading],
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default = "default_success")]
    success: bool,
    prediction: Option<WirePrediction>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    predictions: Vec<WirePrediction>,
}

#[derive(Debug, Deserialize)]
struct WirePrediction {
    prediction: String,
    confidence: f64,
    risk_score: f64,
    #[serde(default)]
    factors: Vec<String>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    model_loaded: bool,
    #[serde(default)]
    model_version: Option<String>,
}

fn default_success() -> bool {
    true
}

impl WirePrediction {
    fn into_prediction(self, now: DateTime<Utc>) -> Result<Prediction, GatewayError> {
        let label: RiskLevel = self
            .prediction
            .parse()
            .map_err(GatewayError::Malformed)?;
        if !(0.0..=1.0).contains(&self.risk_score) {
            return Err(GatewayError::Malformed(format!(
                "risk score {} outside [0, 1]",
                self.risk_score
            )));
        }
        let timestamp = self
            .timestamp
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(now);

        Ok(Prediction {
            label,
            confidence: self.confidence,
            risk_score: self.risk_score,
            factors: self.factors,
            model_version: self.model_version.unwrap_or_else(|| "unknown".to_string()),
            source: PredictionSource::Api,
            timestamp,
        })
    }
}

impl HttpPredictionClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build prediction HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

fn transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

#[async_trait]
impl PredictionBackend for HttpPredictionClient {
    async fn predict(&self, reading: &DeviceReading) -> Result<Prediction, GatewayError> {
        let response = self
            .client
            .post(self.url("predict"))
            .json(reading)
            .send()
            .await
            .map_err(transport)?;
        let body: PredictResponse = Self::read_json(response).await?;
        if !body.success {
            return Err(GatewayError::Malformed("service reported failure".to_string()));
        }
        body.prediction
            .ok_or_else(|| GatewayError::Malformed("missing prediction".to_string()))?
            .into_prediction(Utc::now())
    }

    async fn predict_batch(&self, readings: &[DeviceReading]) -> Result<Vec<Prediction>, GatewayError> {
        let response = self
            .client
            .post(self.url("batch-predict"))
            .json(&BatchRequest { devices: readings })
            .send()
            .await
            .map_err(transport)?;
        let body: BatchResponse = Self::read_json(response).await?;
        if !body.success {
            return Err(GatewayError::Malformed("service reported failure".to_string()));
        }
        tracing::debug!(requested = readings.len(), received = body.predictions.len(), "batch prediction response");

        let now = Utc::now();
        body.predictions
            .into_iter()
            .map(|p| p.into_prediction(now))
            .collect()
    }

    async fn status(&self) -> Result<ModelStatus, GatewayError> {
        let response = self
            .client
            .get(self.url("status"))
            .send()
            .await
            .map_err(transport)?;
        let body: StatusResponse = Self::read_json(response).await?;
        Ok(ModelStatus {
            model_loaded: body.model_loaded,
            model_version: body.model_version,
        })
    }
}
