// Alert engine - edge-triggered critical alerts from device state
use crate::domain::alert::{AlertLog, AlertSeverity, NewAlert, Popup, PopupTray};
use crate::domain::device::Device;
use crate::domain::fleet::Fleet;
use crate::domain::prediction::{PredictionSource, RiskLevel};
use chrono::{DateTime, Utc};

pub const CRITICAL_ALERT_TITLE: &str = "CRITICAL DEVICE ALERT";
pub const TEMPERATURE_LIMIT: f64 = 38.0;
pub const VIBRATION_LIMIT: f64 = 0.8;
pub const ERROR_LOG_LIMIT: u32 = 20;

/// Ambient facts the engine needs besides the fleet
#[derive(Debug, Clone, Copy)]
pub struct AlertContext {
    pub api_connected: bool,
    pub sound_enabled: bool,
    pub now: DateTime<Utc>,
}

pub fn should_alert(device: &Device) -> bool {
    device.risk_level() == Some(RiskLevel::High)
        || device.telemetry.temperature > TEMPERATURE_LIMIT
        || device.telemetry.vibration > VIBRATION_LIMIT
        || device.telemetry.error_logs > ERROR_LOG_LIMIT
}

/// Scan the fleet, raising an alert on every false→true crossing.
///
/// Returns the number of alerts raised, including ones the log dropped as duplicates.
pub fn scan(fleet: &mut Fleet, alerts: &mut AlertLog, popups: &mut PopupTray, ctx: AlertContext) -> usize {
    let mut raised = 0;

    for device in fleet.iter_mut() {
        let triggered = should_alert(device);

        if triggered && !device.alerted {
            device.alerted = true;
            raised += 1;

            let source = match &device.prediction {
                Some(prediction) => prediction.source,
                None if ctx.api_connected => PredictionSource::Api,
                None => PredictionSource::Fallback,
            };
            let alert_id = alerts.insert(
                NewAlert {
                    severity: AlertSeverity::Critical,
                    title: CRITICAL_ALERT_TITLE.to_string(),
                    message: format!("{} requires immediate inspection", device.device_name),
                    location: device.location.clone(),
                    source,
                },
                ctx.now,
            );

            tracing::info!(
                device_id = device.id,
                device = %device.device_name,
                location = %device.location,
                logged = alert_id.is_some(),
                "critical device alert"
            );

            popups.push(Popup {
                alert_id,
                device_id: device.id,
                device_name: device.device_name.clone(),
                device_type: device.device_type.to_string(),
                location: device.location.clone(),
                risk_level: device.risk_level().unwrap_or(RiskLevel::High),
                temperature: device.telemetry.temperature,
                vibration: device.telemetry.vibration,
                offline: !ctx.api_connected,
                play_sound: ctx.sound_enabled,
                expires_at: ctx.now + popups.ttl(),
            });
        } else if !triggered && device.alerted {
            device.alerted = false;
        }
    }

    popups.purge_expired(ctx.now);
    raised
}
