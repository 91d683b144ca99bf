// Dashboard snapshot handed to the display layer after every tick
use super::alert::{Alert, Popup};
use super::chart::{ChartSet, SeriesStats};
use super::device::Device;
use super::prediction::ApiStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamingStatus {
    pub running: bool,
    pub interval_ms: u64,
    pub tick_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FleetSummary {
    pub total: usize,
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
    pub with_predictions: usize,
    pub active_alerts: usize,
    pub critical_alerts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub devices: Vec<Device>,
    pub alerts: Vec<Alert>,
    pub popups: Vec<Popup>,
    pub charts: ChartSet,
    pub streaming_stats: Option<SeriesStats>,
    pub api_status: ApiStatus,
    pub streaming: StreamingStatus,
    pub summary: FleetSummary,
    pub sound_enabled: bool,
}

/// Read-only dump of the whole monitor state
#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: DashboardSnapshot,
}

impl ExportDocument {
    pub fn new(snapshot: DashboardSnapshot, exported_at: DateTime<Utc>) -> Self {
        Self {
            exported_at,
            snapshot,
        }
    }

    pub fn file_name(&self) -> String {
        format!("medical-devices-export-{}.json", self.exported_at.format("%Y-%m-%d"))
    }
}
