// Update scheduler - drives Monitor::tick on a fixed period
use crate::application::monitor::Monitor;
use crate::domain::dashboard::StreamingStatus;
use crate::infrastructure::config::MIN_INTERVAL_MS;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("interval must be at least {min}ms, got {requested}ms")]
    IntervalTooShort { requested: u64, min: u64 },
}

struct ActiveLoop {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct Control {
    interval: Duration,
    active: Option<ActiveLoop>,
}

/// Owns the single periodic update loop.
///
/// A tick that has started always runs to completion; stopping only prevents
/// the next one. Changing the interval waits for the old loop to exit before
/// starting the new one, so two loops never run at once.
pub struct UpdateScheduler {
    monitor: Arc<Monitor>,
    control: Mutex<Control>,
}

impl UpdateScheduler {
    pub fn new(monitor: Arc<Monitor>, interval: Duration) -> Self {
        Self {
            monitor,
            control: Mutex::new(Control {
                interval,
                active: None,
            }),
        }
    }

    /// Start the loop. Returns false when it was already running.
    pub async fn start(&self) -> bool {
        let mut control = self.control.lock().await;
        if control.active.is_some() {
            return false;
        }
        control.active = Some(self.spawn_loop(control.interval));
        self.monitor.set_streaming(true, as_millis(control.interval));
        tracing::info!(interval_ms = as_millis(control.interval), "update loop started");
        true
    }

    /// Stop the loop after any in-flight tick. Returns false when it was not running.
    pub async fn stop(&self) -> bool {
        let mut control = self.control.lock().await;
        let Some(active) = control.active.take() else {
            return false;
        };
        shutdown(active).await;
        self.monitor.set_streaming(false, as_millis(control.interval));
        tracing::info!("update loop stopped");
        true
    }

    /// Change the period; a running loop is restarted with the new value.
    pub async fn set_interval(&self, interval: Duration) -> Result<StreamingStatus, ScheduleError> {
        let requested = as_millis(interval);
        if requested < MIN_INTERVAL_MS {
            return Err(ScheduleError::IntervalTooShort {
                requested,
                min: MIN_INTERVAL_MS,
            });
        }

        let mut control = self.control.lock().await;
        control.interval = interval;
        let running = match control.active.take() {
            Some(active) => {
                shutdown(active).await;
                control.active = Some(self.spawn_loop(interval));
                true
            }
            None => false,
        };
        tracing::info!(interval_ms = requested, running, "update interval changed");
        Ok(self.monitor.set_streaming(running, requested))
    }

    pub async fn is_running(&self) -> bool {
        self.control.lock().await.active.is_some()
    }

    pub async fn interval(&self) -> Duration {
        self.control.lock().await.interval
    }

    fn spawn_loop(&self, period: Duration) -> ActiveLoop {
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_loop(self.monitor.clone(), period, stop_rx));
        ActiveLoop { stop_tx, handle }
    }
}

async fn run_loop(monitor: Arc<Monitor>, period: Duration, mut stop_rx: oneshot::Receiver<()>) {
    monitor.refresh_status().await;

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                let report = monitor.tick().await;
                tracing::debug!(
                    tick = report.tick,
                    simulated = report.simulated,
                    scored = report.scored,
                    degraded = report.degraded,
                    alerts_raised = report.alerts_raised,
                    "tick complete"
                );
            }
        }
    }
}

async fn shutdown(active: ActiveLoop) {
    let _ = active.stop_tx.send(());
    if let Err(e) = active.handle.await {
        tracing::error!(error = %e, "update loop ended abnormally");
    }
}

fn as_millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::prediction_gateway::PredictionGateway;
    use crate::application::testing::{FakeBackend, Mode};
    use crate::infrastructure::config::MonitorConfig;
    use std::sync::atomic::Ordering;

    fn setup(backend: FakeBackend) -> (Arc<Monitor>, Arc<FakeBackend>, UpdateScheduler) {
        let backend = Arc::new(backend);
        let mut config = MonitorConfig::default();
        config.fleet.count = 6;
        config.fleet.seed = Some(3);
        let monitor = Arc::new(Monitor::new(&config, PredictionGateway::new(backend.clone())));
        let scheduler = UpdateScheduler::new(monitor.clone(), Duration::from_millis(2000));
        (monitor, backend, scheduler)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_stop_are_idempotent() {
        let (monitor, _backend, scheduler) = setup(FakeBackend::new(Mode::Healthy));

        assert!(!scheduler.stop().await);
        assert!(scheduler.start().await);
        assert!(!scheduler.start().await);
        assert!(scheduler.is_running().await);
        assert!(monitor.streaming_status().running);

        tokio::time::sleep(Duration::from_millis(4100)).await;
        assert!(scheduler.stop().await);
        assert!(!scheduler.stop().await);
        assert!(!monitor.streaming_status().running);
        assert_eq!(monitor.streaming_status().tick_count, 2);

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(monitor.streaming_status().tick_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_keeps_a_single_loop() {
        let (monitor, _backend, scheduler) = setup(FakeBackend::new(Mode::Healthy));
        let before = monitor.snapshot().devices;

        scheduler.start().await;
        let status = scheduler.set_interval(Duration::from_millis(1000)).await.unwrap();
        assert!(status.running);
        assert_eq!(status.interval_ms, 1000);

        // restarting the loop does not advance the fleet by itself
        let after: Vec<_> = monitor.snapshot().devices.iter().map(|d| d.telemetry.clone()).collect();
        let before: Vec<_> = before.iter().map(|d| d.telemetry.clone()).collect();
        assert_eq!(before, after);

        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(monitor.streaming_status().tick_count, 5);
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_while_stopped_does_not_start() {
        let (monitor, _backend, scheduler) = setup(FakeBackend::new(Mode::Healthy));
        let status = scheduler.set_interval(Duration::from_millis(500)).await.unwrap();
        assert!(!status.running);
        assert!(!scheduler.is_running().await);
        assert_eq!(scheduler.interval().await, Duration::from_millis(500));

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(monitor.streaming_status().tick_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_too_short_interval() {
        let (_monitor, _backend, scheduler) = setup(FakeBackend::new(Mode::Healthy));
        assert_eq!(
            scheduler.set_interval(Duration::from_millis(20)).await,
            Err(ScheduleError::IntervalTooShort { requested: 20, min: 100 })
        );
        assert_eq!(scheduler.interval().await, Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_in_flight_tick_finish() {
        let (monitor, backend, scheduler) = setup(FakeBackend::with_batch_latency(
            Mode::Healthy,
            Duration::from_millis(500),
        ));
        scheduler.start().await;

        // first tick starts at 2000ms and is still waiting on the batch at 2200ms
        tokio::time::sleep(Duration::from_millis(2200)).await;
        assert_eq!(backend.batch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.streaming_status().tick_count, 0);

        assert!(scheduler.stop().await);
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.streaming.tick_count, 1);
        assert!(snapshot.devices.iter().all(|d| !d.is_updating));

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(backend.batch_calls.load(Ordering::SeqCst), 1);
    }
}
