// Prediction domain models shared by the API and fallback paths
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Low" | "low" => Ok(RiskLevel::Low),
            "Medium" | "medium" => Ok(RiskLevel::Medium),
            "High" | "high" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level '{}'", other)),
        }
    }
}

/// Where a prediction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionSource {
    #[serde(rename = "API")]
    Api,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: RiskLevel,
    pub confidence: f64,
    pub risk_score: f64,
    pub factors: Vec<String>,
    pub model_version: String,
    pub source: PredictionSource,
    pub timestamp: DateTime<Utc>,
}

impl Prediction {
    pub fn is_fallback(&self) -> bool {
        self.source == PredictionSource::Fallback
    }
}

/// Connectivity of the external prediction service
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiStatus {
    pub connected: bool,
    pub model_loaded: bool,
    pub model_version: Option<String>,
    pub last_check: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ApiStatus {
    pub fn connected(model_loaded: bool, model_version: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            connected: true,
            model_loaded,
            model_version,
            last_check: Some(at),
            error: None,
        }
    }

    pub fn disconnected(error: String, at: DateTime<Utc>) -> Self {
        Self {
            connected: false,
            model_loaded: false,
            model_version: None,
            last_check: Some(at),
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_parse() {
        assert_eq!("High".parse::<RiskLevel>(), Ok(RiskLevel::High));
        assert_eq!("medium".parse::<RiskLevel>(), Ok(RiskLevel::Medium));
        assert!("Critical".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_source_serializes_as_tag() {
        assert_eq!(serde_json::to_string(&PredictionSource::Api).unwrap(), "\"API\"");
        assert_eq!(
            serde_json::to_string(&PredictionSource::Fallback).unwrap(),
            "\"Fallback\""
        );
    }
}
