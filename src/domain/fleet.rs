// Fleet store and device generation policies
use super::device::{CatalogEntry, Device, DeviceType};
use super::prediction::RiskLevel;
use super::telemetry::Telemetry;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

/// How device names and locations are laid out across a new fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPolicy {
    /// `count` devices; names cycle through the catalog, locations are drawn at random
    CatalogCycle { count: usize },
    /// `per_location` devices at every location in order; names cycle by running id
    PerLocation { per_location: usize },
}

impl GenerationPolicy {
    pub fn fleet_size(&self, location_count: usize) -> usize {
        match *self {
            GenerationPolicy::CatalogCycle { count } => count,
            GenerationPolicy::PerLocation { per_location } => per_location * location_count,
        }
    }
}

/// Initial parameters drawn for a new device
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedParameters {
    pub telemetry: Telemetry,
    pub device_age: f64,
    pub repairs: u32,
}

/// Draw realistic starting parameters, then apply the per-type overrides.
pub fn generate_parameters<R: Rng + ?Sized>(device_type: DeviceType, rng: &mut R) -> GeneratedParameters {
    let mut telemetry = Telemetry {
        temperature: rng.gen_range(20.0..45.0),
        vibration: rng.gen_range(0.0..1.2),
        error_logs: rng.gen_range(0..30),
        runtime_hours: rng.gen_range(1000.0..9000.0),
        pressure: 0.0,
        current_draw: 0.0,
    };
    let device_age = rng.gen_range(0.5..5.5);
    let repairs = rng.gen_range(0..8);
    telemetry.pressure = rng.gen_range(80.0..180.0);
    telemetry.current_draw = rng.gen_range(3.0..11.0);

    match device_type {
        DeviceType::PatientVentilator => {
            telemetry.temperature = telemetry.temperature.min(35.0);
            telemetry.pressure = rng.gen_range(100.0..150.0);
        }
        DeviceType::DialysisMachine => {
            telemetry.pressure = rng.gen_range(120.0..200.0);
            telemetry.current_draw = rng.gen_range(6.0..11.0);
        }
        DeviceType::CtScanner => {
            telemetry.current_draw = rng.gen_range(8.0..15.0);
            telemetry.temperature = rng.gen_range(25.0..40.0);
        }
        DeviceType::Defibrillator => {
            telemetry.current_draw = rng.gen_range(2.0..14.0);
            telemetry.vibration = rng.gen_range(0.0..0.4);
        }
        _ => {}
    }

    GeneratedParameters {
        telemetry,
        device_age,
        repairs,
    }
}

/// Counts of devices per predicted risk level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl RiskCounts {
    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

/// Ordered, fixed-size collection of simulated devices
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    devices: Vec<Device>,
}

impl Fleet {
    /// Build a fleet under `policy`. Identical RNG streams yield identical fleets.
    pub fn initialize<R: Rng + ?Sized>(
        policy: GenerationPolicy,
        catalog: &[CatalogEntry],
        locations: &[String],
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Self {
        if catalog.is_empty() || locations.is_empty() {
            return Self::default();
        }

        let slots: Vec<(usize, String)> = match policy {
            GenerationPolicy::CatalogCycle { count } => (0..count)
                .map(|i| {
                    let location = locations[rng.gen_range(0..locations.len())].clone();
                    (i % catalog.len(), location)
                })
                .collect(),
            GenerationPolicy::PerLocation { per_location } => locations
                .iter()
                .flat_map(|location| std::iter::repeat(location).take(per_location))
                .enumerate()
                .map(|(i, location)| (i % catalog.len(), location.clone()))
                .collect(),
        };

        let devices = slots
            .into_iter()
            .enumerate()
            .map(|(i, (catalog_index, location))| {
                let (name, device_type) = catalog[catalog_index];
                let params = generate_parameters(device_type, rng);
                Device {
                    id: i as u32 + 1,
                    device_name: name.to_string(),
                    device_type,
                    location,
                    telemetry: params.telemetry,
                    device_age: params.device_age,
                    repairs: params.repairs,
                    prediction: None,
                    alerted: false,
                    is_updating: false,
                    in_flight: 0,
                    last_update: now,
                }
            })
            .collect();

        Self { devices }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Device> {
        self.devices.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Device> {
        self.devices.iter_mut()
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| d.id == id)
    }

    /// Ids of the first `n` devices in current order
    pub fn front_ids(&self, n: usize) -> Vec<u32> {
        self.devices.iter().take(n).map(|d| d.id).collect()
    }

    /// Move the first `n` devices to the back, keeping relative order.
    pub fn rotate_front_to_back(&mut self, n: usize) {
        if self.devices.is_empty() {
            return;
        }
        let n = n % self.devices.len();
        self.devices.rotate_left(n);
    }

    pub fn risk_counts(&self) -> RiskCounts {
        let mut counts = RiskCounts::default();
        for level in self.devices.iter().filter_map(Device::risk_level) {
            match level {
                RiskLevel::Low => counts.low += 1,
                RiskLevel::Medium => counts.medium += 1,
                RiskLevel::High => counts.high += 1,
            }
        }
        counts
    }

    pub fn mean_temperature(&self) -> Option<f64> {
        if self.devices.is_empty() {
            return None;
        }
        let sum: f64 = self.devices.iter().map(|d| d.telemetry.temperature).sum();
        Some(sum / self.devices.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::{DEFAULT_LOCATIONS, DEVICE_CATALOG};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn locations() -> Vec<String> {
        DEFAULT_LOCATIONS.iter().map(|l| l.to_string()).collect()
    }

    fn fleet(policy: GenerationPolicy, seed: u64) -> Fleet {
        let mut rng = StdRng::seed_from_u64(seed);
        Fleet::initialize(policy, &DEVICE_CATALOG, &locations(), &mut rng, Utc::now())
    }

    #[test]
    fn test_catalog_cycle_assigns_sequential_ids_and_names() {
        let fleet = fleet(GenerationPolicy::CatalogCycle { count: 30 }, 7);
        assert_eq!(fleet.len(), 30);
        for (i, device) in fleet.iter().enumerate() {
            assert_eq!(device.id, i as u32 + 1);
            let (name, device_type) = DEVICE_CATALOG[i % DEVICE_CATALOG.len()];
            assert_eq!(device.device_name, name);
            assert_eq!(device.device_type, device_type);
            assert!(DEFAULT_LOCATIONS.contains(&device.location.as_str()));
            assert!(device.prediction.is_none());
            assert!(!device.alerted);
        }
    }

    #[test]
    fn test_per_location_distributes_evenly() {
        let fleet = fleet(GenerationPolicy::PerLocation { per_location: 5 }, 7);
        assert_eq!(fleet.len(), 25);
        for (i, location) in DEFAULT_LOCATIONS.iter().enumerate() {
            let at_location: Vec<&Device> = fleet.iter().filter(|d| d.location == *location).collect();
            assert_eq!(at_location.len(), 5);
            assert_eq!(at_location[0].id, (i * 5) as u32 + 1);
        }
        // the 25th device wraps back to the first catalog name
        assert_eq!(fleet.devices()[24].device_name, DEVICE_CATALOG[0].0);
    }

    #[test]
    fn test_generation_is_reproducible_for_a_seed() {
        let a = fleet(GenerationPolicy::CatalogCycle { count: 24 }, 42);
        let b = fleet(GenerationPolicy::CatalogCycle { count: 24 }, 42);
        for (left, right) in a.iter().zip(b.iter()) {
            assert_eq!(left.location, right.location);
            assert_eq!(left.telemetry, right.telemetry);
            assert_eq!(left.device_age, right.device_age);
            assert_eq!(left.repairs, right.repairs);
        }
    }

    #[test]
    fn test_type_overrides_hold() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let vent = generate_parameters(DeviceType::PatientVentilator, &mut rng);
            assert!(vent.telemetry.temperature <= 35.0);
            assert!((100.0..150.0).contains(&vent.telemetry.pressure));

            let dialysis = generate_parameters(DeviceType::DialysisMachine, &mut rng);
            assert!((120.0..200.0).contains(&dialysis.telemetry.pressure));
            assert!((6.0..11.0).contains(&dialysis.telemetry.current_draw));

            let ct = generate_parameters(DeviceType::CtScanner, &mut rng);
            assert!((25.0..40.0).contains(&ct.telemetry.temperature));

            let defib = generate_parameters(DeviceType::Defibrillator, &mut rng);
            assert!(defib.telemetry.vibration < 0.4);

            let pump = generate_parameters(DeviceType::InfusionPump, &mut rng);
            assert!(pump.telemetry.is_within_bounds());
            assert!(pump.repairs < 8);
            assert!(pump.telemetry.error_logs < 30);
        }
    }

    #[test]
    fn test_rotate_front_to_back() {
        let mut fleet = fleet(GenerationPolicy::CatalogCycle { count: 8 }, 1);
        fleet.rotate_front_to_back(3);
        let ids: Vec<u32> = fleet.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![4, 5, 6, 7, 8, 1, 2, 3]);
        assert_eq!(fleet.front_ids(2), vec![4, 5]);
    }

    #[test]
    fn test_empty_locations_yield_empty_fleet() {
        let mut rng = StdRng::seed_from_u64(1);
        let fleet = Fleet::initialize(
            GenerationPolicy::CatalogCycle { count: 4 },
            &DEVICE_CATALOG,
            &[],
            &mut rng,
            Utc::now(),
        );
        assert!(fleet.is_empty());
        assert_eq!(fleet.mean_temperature(), None);
    }
}
