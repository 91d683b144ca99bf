// Rolling chart buffers fed by the update scheduler
use super::fleet::{Fleet, RiskCounts};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const AVERAGE_TEMPERATURE_CAPACITY: usize = 20;
pub const SAMPLED_TEMPERATURE_CAPACITY: usize = 30;

/// Charts that can be paused from the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Risk,
    Temperature,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSample {
    /// Wall-clock label shown on the x axis
    pub label: String,
    pub time_ms: i64,
    pub value: f64,
}

impl ChartSample {
    pub fn at(now: DateTime<Utc>, value: f64) -> Self {
        Self {
            label: now.format("%H:%M:%S").to_string(),
            time_ms: now.timestamp_millis(),
            value,
        }
    }
}

/// Fixed-capacity series that evicts its oldest sample on overflow
#[derive(Debug, Clone, Serialize)]
pub struct RollingSeries {
    capacity: usize,
    paused: bool,
    samples: VecDeque<ChartSample>,
}

impl RollingSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            paused: false,
            samples: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Append unless paused. Returns whether the sample was kept.
    pub fn record(&mut self, sample: ChartSample) -> bool {
        if self.paused {
            return false;
        }
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        true
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn stats(&self) -> Option<SeriesStats> {
        let count = self.len();
        if count == 0 {
            return None;
        }
        let values = self.samples.iter().map(|s| s.value);
        let min = values.clone().fold(f64::INFINITY, f64::min);
        let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.sum::<f64>() / count as f64;
        Some(SeriesStats {
            count,
            mean,
            min,
            max,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Low/Medium/High counts recomputed from the whole fleet every tick
#[derive(Debug, Clone, Default, Serialize)]
pub struct RiskDistribution {
    pub counts: RiskCounts,
    pub paused: bool,
}

impl RiskDistribution {
    pub fn refresh(&mut self, fleet: &Fleet) -> bool {
        if self.paused {
            return false;
        }
        self.counts = fleet.risk_counts();
        true
    }
}

/// The three buffers consumed by the display layer
#[derive(Debug, Clone, Serialize)]
pub struct ChartSet {
    pub risk: RiskDistribution,
    pub average_temperature: RollingSeries,
    /// Not pausable; only fed while streaming
    pub sampled_temperature: RollingSeries,
}

impl ChartSet {
    pub fn new(average_capacity: usize, sampled_capacity: usize) -> Self {
        Self {
            risk: RiskDistribution::default(),
            average_temperature: RollingSeries::new(average_capacity),
            sampled_temperature: RollingSeries::new(sampled_capacity),
        }
    }

    /// Feed one tick's worth of samples from the fleet.
    pub fn ingest<R: Rng + ?Sized>(&mut self, fleet: &Fleet, rng: &mut R, now: DateTime<Utc>, streaming: bool) {
        self.risk.refresh(fleet);

        if let Some(mean) = fleet.mean_temperature() {
            self.average_temperature.record(ChartSample::at(now, mean));
        }

        if streaming && !fleet.is_empty() {
            let device = &fleet.devices()[rng.gen_range(0..fleet.len())];
            self.sampled_temperature
                .record(ChartSample::at(now, device.telemetry.temperature));
        }
    }

    /// Flip the pause state of a chart and return the new state
    pub fn toggle_pause(&mut self, chart: ChartKind) -> bool {
        match chart {
            ChartKind::Risk => {
                self.risk.paused = !self.risk.paused;
                self.risk.paused
            }
            ChartKind::Temperature => {
                let paused = !self.average_temperature.is_paused();
                self.average_temperature.set_paused(paused);
                paused
            }
        }
    }
}

impl Default for ChartSet {
    fn default() -> Self {
        Self::new(AVERAGE_TEMPERATURE_CAPACITY, SAMPLED_TEMPERATURE_CAPACITY)
    }
}
