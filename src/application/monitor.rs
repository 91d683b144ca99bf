// Monitor - owns the application state and runs ticks and manual actions
use crate::application::alert_engine::{self, AlertContext};
use crate::application::prediction_gateway::PredictionGateway;
use crate::application::simulator;
use crate::domain::alert::{AlertLog, PopupTray};
use crate::domain::chart::{ChartKind, ChartSet};
use crate::domain::dashboard::{DashboardSnapshot, ExportDocument, FleetSummary, StreamingStatus};
use crate::domain::device::{device_type_for, DeviceType, DEVICE_CATALOG};
use crate::domain::fallback::fallback_prediction;
use crate::domain::fleet::Fleet;
use crate::domain::prediction::{ApiStatus, Prediction};
use crate::domain::telemetry::DeviceReading;
use crate::infrastructure::config::MonitorConfig;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("{0} is already running")]
    Busy(&'static str),

    #[error("device {0} not found")]
    DeviceNotFound(u32),

    #[error("alert {0} not found")]
    AlertNotFound(u64),
}

/// Everything the dashboard shows, owned by one [`Monitor`]
pub struct MonitorState {
    pub fleet: Fleet,
    pub alerts: AlertLog,
    pub popups: PopupTray,
    pub charts: ChartSet,
    pub api_status: ApiStatus,
    pub streaming: StreamingStatus,
    pub sound_enabled: bool,
    pub rng: StdRng,
}

/// Outcome of one scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub simulated: usize,
    pub scored: usize,
    pub degraded: bool,
    pub alerts_raised: usize,
}

/// One row of a manual batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub device_id: u32,
    pub device_name: String,
    pub device_type: DeviceType,
    pub location: String,
    pub prediction: Prediction,
}

/// Clears a busy flag when the action finishes, however it finishes
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool, action: &'static str) -> Result<Self, ActionError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BusyGuard(flag))
            .map_err(|_| ActionError::Busy(action))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Monitor {
    state: Mutex<MonitorState>,
    gateway: PredictionGateway,
    window_size: usize,
    status_check_every: u64,
    degraded_retries: usize,
    updates: broadcast::Sender<Arc<DashboardSnapshot>>,
    analyze_busy: AtomicBool,
    batch_busy: AtomicBool,
}

impl Monitor {
    pub fn new(config: &MonitorConfig, gateway: PredictionGateway) -> Self {
        let mut rng = match config.fleet.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let fleet = Fleet::initialize(
            config.fleet.generation_policy(),
            &DEVICE_CATALOG,
            &config.fleet.locations,
            &mut rng,
            Utc::now(),
        );
        tracing::info!(
            devices = fleet.len(),
            locations = config.fleet.locations.len(),
            policy = ?config.fleet.policy,
            "generated medical device fleet"
        );

        let state = MonitorState {
            fleet,
            alerts: AlertLog::new(config.alerts.capacity),
            popups: PopupTray::new(Duration::seconds(config.alerts.popup_secs)),
            charts: ChartSet::new(config.charts.average_capacity, config.charts.sampled_capacity),
            api_status: ApiStatus::default(),
            streaming: StreamingStatus {
                running: false,
                interval_ms: config.scheduler.interval_ms,
                tick_count: 0,
            },
            sound_enabled: config.alerts.sound_enabled,
            rng,
        };
        let (updates, _) = broadcast::channel(16);

        Self {
            state: Mutex::new(state),
            gateway,
            window_size: config.scheduler.window_size,
            status_check_every: config.scheduler.status_check_every,
            degraded_retries: config.scheduler.degraded_retries,
            updates,
            analyze_busy: AtomicBool::new(false),
            batch_busy: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one scheduler step: simulate, score the rotating window, alert, chart.
    ///
    /// The state lock is never held across an await; devices being scored are
    /// flagged `is_updating` so the simulator leaves them alone meanwhile.
    /// The window always moves on, also when the batch call cannot be made.
    pub async fn tick(&self) -> TickReport {
        let (simulated, readings) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let simulated = simulator::advance(&mut state.fleet, &mut state.rng, Utc::now());

            let window = state.fleet.front_ids(self.window_size);
            let readings: Vec<(u32, DeviceReading)> = window
                .into_iter()
                .filter_map(|id| {
                    let device = state.fleet.get_mut(id)?;
                    device.begin_update();
                    Some((id, device.reading()))
                })
                .collect();
            (simulated, readings)
        };

        let ids: Vec<u32> = readings.iter().map(|(id, _)| *id).collect();
        let payload: Vec<DeviceReading> = readings.into_iter().map(|(_, r)| r).collect();

        let (predictions, degraded) = match self.gateway.try_predict_batch(&payload).await {
            Ok(predictions) => (predictions, false),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retries = self.degraded_retries,
                    "batch prediction unavailable, retrying individually"
                );
                let mut predictions = Vec::with_capacity(payload.len());
                for (position, reading) in payload.iter().enumerate() {
                    let prediction = if position < self.degraded_retries {
                        self.gateway.predict_one(reading).await
                    } else {
                        fallback_prediction(reading, Utc::now())
                    };
                    predictions.push(prediction);
                }
                (predictions, true)
            }
        };

        let scored = {
            let mut state = self.lock();
            let scored = merge_predictions(&mut state.fleet, ids.iter().copied().zip(predictions));
            state.fleet.rotate_front_to_back(ids.len());
            scored
        };

        let (tick, alerts_raised) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let now = Utc::now();
            let ctx = AlertContext {
                api_connected: state.api_status.connected,
                sound_enabled: state.sound_enabled,
                now,
            };
            let alerts_raised = alert_engine::scan(&mut state.fleet, &mut state.alerts, &mut state.popups, ctx);
            let streaming = state.streaming.running;
            state.charts.ingest(&state.fleet, &mut state.rng, now, streaming);
            state.streaming.tick_count += 1;
            (state.streaming.tick_count, alerts_raised)
        };

        if tick % self.status_check_every == 0 {
            self.refresh_status().await;
        }

        self.publish();

        TickReport {
            tick,
            simulated,
            scored,
            degraded,
            alerts_raised,
        }
    }

    /// Probe the prediction service and record the result
    pub async fn refresh_status(&self) -> ApiStatus {
        let status = self.gateway.check_status().await;
        let mut state = self.lock();
        if state.api_status.connected != status.connected {
            if status.connected {
                tracing::info!(model_version = ?status.model_version, "prediction service connected");
            } else {
                tracing::warn!(error = ?status.error, "prediction service disconnected, using fallback predictions");
            }
        }
        state.api_status = status.clone();
        status
    }

    /// Score one fleet device on demand.
    pub async fn analyze_device(&self, id: u32) -> Result<Prediction, ActionError> {
        let _busy = BusyGuard::acquire(&self.analyze_busy, "device analysis")?;

        let reading = {
            let mut state = self.lock();
            let device = state.fleet.get_mut(id).ok_or(ActionError::DeviceNotFound(id))?;
            device.begin_update();
            device.reading()
        };

        let prediction = self.gateway.predict_one(&reading).await;
        tracing::info!(
            device_id = id,
            risk = %prediction.label,
            fallback = prediction.is_fallback(),
            "device analysed"
        );
        merge_predictions(&mut self.lock().fleet, std::iter::once((id, prediction.clone())));
        self.publish();
        Ok(prediction)
    }

    /// Score a reading that is not part of the fleet (the manual form)
    pub async fn analyze_reading(&self, reading: &DeviceReading) -> Result<Prediction, ActionError> {
        let _busy = BusyGuard::acquire(&self.analyze_busy, "device analysis")?;
        tracing::info!(
            device = %reading.device_name,
            device_type = ?device_type_for(&reading.device_name),
            "analysing manual reading"
        );
        Ok(self.gateway.predict_one(reading).await)
    }

    /// Score the whole fleet in one batch and store the results
    pub async fn run_batch(&self) -> Result<Vec<BatchResult>, ActionError> {
        let _busy = BusyGuard::acquire(&self.batch_busy, "batch analysis")?;

        let (ids, readings): (Vec<u32>, Vec<DeviceReading>) = {
            let mut state = self.lock();
            state
                .fleet
                .iter_mut()
                .map(|device| {
                    device.begin_update();
                    (device.id, device.reading())
                })
                .unzip()
        };
        tracing::info!(devices = ids.len(), "running batch analysis");

        let predictions = self.gateway.predict_batch(&readings).await;

        let results = {
            let mut state = self.lock();
            let mut results = Vec::with_capacity(ids.len());
            for (id, prediction) in ids.iter().copied().zip(predictions) {
                if let Some(device) = state.fleet.get_mut(id) {
                    device.apply_prediction(prediction.clone());
                    results.push(BatchResult {
                        device_id: id,
                        device_name: device.device_name.clone(),
                        device_type: device.device_type,
                        location: device.location.clone(),
                        prediction,
                    });
                }
            }
            results
        };

        self.publish();
        Ok(results)
    }

    pub fn toggle_chart_pause(&self, chart: ChartKind) -> bool {
        self.lock().charts.toggle_pause(chart)
    }

    pub fn set_sound(&self, enabled: bool) {
        self.lock().sound_enabled = enabled;
    }

    pub fn dismiss_alert(&self, id: u64) -> Result<(), ActionError> {
        if self.lock().alerts.dismiss(id) {
            Ok(())
        } else {
            Err(ActionError::AlertNotFound(id))
        }
    }

    pub fn clear_alerts(&self) {
        self.lock().alerts.clear();
    }

    pub fn set_streaming(&self, running: bool, interval_ms: u64) -> StreamingStatus {
        let mut state = self.lock();
        state.streaming.running = running;
        state.streaming.interval_ms = interval_ms;
        state.streaming
    }

    pub fn streaming_status(&self) -> StreamingStatus {
        self.lock().streaming
    }

    pub fn api_status(&self) -> ApiStatus {
        self.lock().api_status.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DashboardSnapshot>> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let mut state = self.lock();
        let now = Utc::now();
        state.popups.purge_expired(now);

        let risk = state.fleet.risk_counts();
        let summary = FleetSummary {
            total: state.fleet.len(),
            healthy: risk.low,
            warning: risk.medium,
            critical: risk.high,
            with_predictions: risk.total(),
            active_alerts: state.alerts.len(),
            critical_alerts: state.alerts.critical_count(),
        };

        DashboardSnapshot {
            generated_at: now,
            devices: state.fleet.devices().to_vec(),
            alerts: state.alerts.iter().cloned().collect(),
            popups: state.popups.active(now),
            charts: state.charts.clone(),
            streaming_stats: state.charts.sampled_temperature.stats(),
            api_status: state.api_status.clone(),
            streaming: state.streaming,
            summary,
            sound_enabled: state.sound_enabled,
        }
    }

    pub fn export(&self) -> ExportDocument {
        ExportDocument::new(self.snapshot(), Utc::now())
    }

    fn publish(&self) {
        if self.updates.receiver_count() == 0 {
            return;
        }
        let _ = self.updates.send(Arc::new(self.snapshot()));
    }

    #[cfg(test)]
    pub(crate) fn with_state<T>(&self, f: impl FnOnce(&mut MonitorState) -> T) -> T {
        f(&mut *self.lock())
    }
}

/// Store predictions on the devices they were made for; unknown ids are skipped.
fn merge_predictions(fleet: &mut Fleet, predictions: impl IntoIterator<Item = (u32, Prediction)>) -> usize {
    let mut merged = 0;
    for (id, prediction) in predictions {
        if let Some(device) = fleet.get_mut(id) {
            device.apply_prediction(prediction);
            merged += 1;
        }
    }
    merged
}
