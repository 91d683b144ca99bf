// Device domain model and the fixed device catalog
use super::prediction::{Prediction, RiskLevel};
use super::telemetry::{DeviceReading, Telemetry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "Anesthesia Machine")]
    AnesthesiaMachine,
    #[serde(rename = "CT Scanner")]
    CtScanner,
    #[serde(rename = "Defibrillator")]
    Defibrillator,
    #[serde(rename = "Dialysis Machine")]
    DialysisMachine,
    #[serde(rename = "ECG Monitor")]
    EcgMonitor,
    #[serde(rename = "Infusion Pump")]
    InfusionPump,
    #[serde(rename = "Patient Ventilator")]
    PatientVentilator,
    #[serde(rename = "Ultrasound Machine")]
    UltrasoundMachine,
}

impl DeviceType {
    pub fn label(&self) -> &'static str {
        match self {
            DeviceType::AnesthesiaMachine => "Anesthesia Machine",
            DeviceType::CtScanner => "CT Scanner",
            DeviceType::Defibrillator => "Defibrillator",
            DeviceType::DialysisMachine => "Dialysis Machine",
            DeviceType::EcgMonitor => "ECG Monitor",
            DeviceType::InfusionPump => "Infusion Pump",
            DeviceType::PatientVentilator => "Patient Ventilator",
            DeviceType::UltrasoundMachine => "Ultrasound Machine",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One catalog row: a device model name and the type it belongs to
pub type CatalogEntry = (&'static str, DeviceType);

pub const DEVICE_CATALOG: [CatalogEntry; 24] = [
    ("Alaris GH", DeviceType::InfusionPump),
    ("Baxter Flo-Gard", DeviceType::InfusionPump),
    ("Smiths Medfusion", DeviceType::InfusionPump),
    ("Baxter AK 96", DeviceType::DialysisMachine),
    ("Fresenius 4008", DeviceType::DialysisMachine),
    ("NxStage System One", DeviceType::DialysisMachine),
    ("Datex Ohmeda S5", DeviceType::AnesthesiaMachine),
    ("Drager Fabius Trio", DeviceType::AnesthesiaMachine),
    ("GE Aisys", DeviceType::AnesthesiaMachine),
    ("Drager V500", DeviceType::PatientVentilator),
    ("Hamilton G5", DeviceType::PatientVentilator),
    ("Puritan Bennett 980", DeviceType::PatientVentilator),
    ("HeartStart FRx", DeviceType::Defibrillator),
    ("Lifepak 20", DeviceType::Defibrillator),
    ("Philips HeartStrart", DeviceType::Defibrillator),
    ("Zoll R Series", DeviceType::Defibrillator),
    ("GE Logiq E9", DeviceType::UltrasoundMachine),
    ("Philips EPIQ", DeviceType::UltrasoundMachine),
    ("Siemens Acuson", DeviceType::UltrasoundMachine),
    ("Siemens S2000", DeviceType::UltrasoundMachine),
    ("GE Revolution", DeviceType::CtScanner),
    ("Philips Ingenuity", DeviceType::CtScanner),
    ("GE MAC 2000", DeviceType::EcgMonitor),
    ("Phillips PageWriter", DeviceType::EcgMonitor),
];

pub const DEFAULT_LOCATIONS: [&str; 5] = [
    "Hospital A - ICU",
    "Hospital A - Emergency",
    "Hospital B - Nephrology",
    "Hospital B - Cardiology",
    "Hospital C - Surgery",
];

/// Look up the device type for a catalog name
pub fn device_type_for(name: &str) -> Option<DeviceType> {
    DEVICE_CATALOG
        .iter()
        .find(|(catalog_name, _)| *catalog_name == name)
        .map(|(_, device_type)| *device_type)
}

/// A simulated medical instrument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: u32,
    pub device_name: String,
    pub device_type: DeviceType,
    pub location: String,
    #[serde(flatten)]
    pub telemetry: Telemetry,
    pub device_age: f64,
    pub repairs: u32,
    /// Absent until the first prediction lands
    pub prediction: Option<Prediction>,
    /// Edge-trigger latch owned by the alert engine
    pub alerted: bool,
    /// Set while any prediction for this device is in flight
    pub is_updating: bool,
    /// Number of outstanding prediction requests
    #[serde(skip)]
    pub(crate) in_flight: u32,
    pub last_update: DateTime<Utc>,
}

impl Device {
    pub fn reading(&self) -> DeviceReading {
        DeviceReading {
            device_name: self.device_name.clone(),
            temperature: self.telemetry.temperature,
            vibration: self.telemetry.vibration,
            error_logs: self.telemetry.error_logs,
            runtime_hours: self.telemetry.runtime_hours,
            device_age: self.device_age,
            repairs: self.repairs,
            pressure: self.telemetry.pressure,
            current_draw: self.telemetry.current_draw,
            location: self.location.clone(),
        }
    }

    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.prediction.as_ref().map(|p| p.label)
    }

    /// Mark a prediction request as outstanding; pair with [`Device::finish_update`].
    pub fn begin_update(&mut self) {
        self.in_flight += 1;
        self.is_updating = true;
    }

    /// Release one outstanding request. The device stays held while others remain.
    pub fn finish_update(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.is_updating = self.in_flight > 0;
    }

    /// Store a result for a request started with [`Device::begin_update`]
    pub fn apply_prediction(&mut self, prediction: Prediction) {
        self.prediction = Some(prediction);
        self.finish_update();
    }
}
