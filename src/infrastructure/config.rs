use crate::domain::device::DEFAULT_LOCATIONS;
use crate::domain::fleet::GenerationPolicy;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MonitorConfig {
    pub server: ServerSettings,
    pub api: ApiSettings,
    pub fleet: FleetSettings,
    pub scheduler: SchedulerSettings,
    pub alerts: AlertSettings,
    pub charts: ChartSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    CatalogCycle,
    PerLocation,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FleetSettings {
    pub policy: PolicyKind,
    /// Fleet size for `catalog_cycle`
    pub count: usize,
    /// Devices per location for `per_location`
    pub per_location: usize,
    pub locations: Vec<String>,
    pub seed: Option<u64>,
}

impl FleetSettings {
    pub fn generation_policy(&self) -> GenerationPolicy {
        match self.policy {
            PolicyKind::CatalogCycle => GenerationPolicy::CatalogCycle { count: self.count },
            PolicyKind::PerLocation => GenerationPolicy::PerLocation {
                per_location: self.per_location,
            },
        }
    }
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            policy: PolicyKind::CatalogCycle,
            count: 24,
            per_location: 5,
            locations: DEFAULT_LOCATIONS.iter().map(|l| l.to_string()).collect(),
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerSettings {
    pub interval_ms: u64,
    /// Devices scored per tick
    pub window_size: usize,
    /// Connectivity is re-checked every this many ticks
    pub status_check_every: u64,
    /// Single-device retries after a batch transport failure
    pub degraded_retries: usize,
    pub autostart: bool,
}

impl SchedulerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            window_size: 6,
            status_check_every: 30,
            degraded_retries: 3,
            autostart: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertSettings {
    pub capacity: usize,
    pub popup_secs: i64,
    pub sound_enabled: bool,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            capacity: 50,
            popup_secs: 10,
            sound_enabled: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartSettings {
    pub average_capacity: usize,
    pub sampled_capacity: usize,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            average_capacity: 20,
            sampled_capacity: 30,
        }
    }
}

/// Smallest accepted update interval
pub const MIN_INTERVAL_MS: u64 = 100;

impl MonitorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scheduler.interval_ms < MIN_INTERVAL_MS {
            anyhow::bail!("scheduler.interval_ms must be at least {}", MIN_INTERVAL_MS);
        }
        if self.scheduler.window_size == 0 {
            anyhow::bail!("scheduler.window_size must be greater than zero");
        }
        if self.scheduler.status_check_every == 0 {
            anyhow::bail!("scheduler.status_check_every must be greater than zero");
        }
        if self.fleet.locations.is_empty() {
            anyhow::bail!("fleet.locations must not be empty");
        }
        if self.fleet.generation_policy().fleet_size(self.fleet.locations.len()) == 0 {
            anyhow::bail!("fleet would contain no devices");
        }
        if self.alerts.capacity == 0 || self.alerts.popup_secs <= 0 {
            anyhow::bail!("alerts.capacity and alerts.popup_secs must be positive");
        }
        if self.charts.average_capacity == 0 || self.charts.sampled_capacity == 0 {
            anyhow::bail!("chart capacities must be greater than zero");
        }
        if self.api.timeout_ms == 0 {
            anyhow::bail!("api.timeout_ms must be greater than zero");
        }
        Ok(())
    }
}

/// Load `config/monitor.*` (optional) overlaid with `MONITOR__SECTION__KEY` variables
pub fn load_monitor_config() -> anyhow::Result<MonitorConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/monitor").required(false))
        .add_source(
            config::Environment::with_prefix("MONITOR")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: MonitorConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
