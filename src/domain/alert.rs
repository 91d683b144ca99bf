// Alert log and popup domain models
use super::prediction::{PredictionSource, RiskLevel};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;

pub const DEFAULT_ALERT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
}

/// An alert before it has been given an id by the log
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub location: String,
    pub source: PredictionSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: u64,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub source: PredictionSource,
}

/// Bounded alert history, newest first, deduplicated on (title, message)
#[derive(Debug, Clone)]
pub struct AlertLog {
    entries: VecDeque<Alert>,
    capacity: usize,
    next_id: u64,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Insert an alert unless an identical one is already logged.
    ///
    /// Returns the id of the new entry, or `None` when it was a duplicate.
    pub fn insert(&mut self, alert: NewAlert, now: DateTime<Utc>) -> Option<u64> {
        let duplicate = self
            .entries
            .iter()
            .any(|a| a.title == alert.title && a.message == alert.message);
        if duplicate {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_front(Alert {
            id,
            severity: alert.severity,
            title: alert.title,
            message: alert.message,
            location: alert.location,
            created_at: now,
            source: alert.source,
        });
        self.entries.truncate(self.capacity);
        Some(id)
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|a| a.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn critical_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|a| a.severity == AlertSeverity::Critical)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.entries.iter()
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_CAPACITY)
    }
}

/// Short-lived notification raised alongside a new alert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub alert_id: Option<u64>,
    pub device_id: u32,
    pub device_name: String,
    pub device_type: String,
    pub location: String,
    pub risk_level: RiskLevel,
    pub temperature: f64,
    pub vibration: f64,
    /// Raised while the prediction service was unreachable
    pub offline: bool,
    pub play_sound: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PopupTray {
    popups: Vec<Popup>,
    ttl: Duration,
}

impl PopupTray {
    pub fn new(ttl: Duration) -> Self {
        Self { popups: Vec::new(), ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn push(&mut self, popup: Popup) {
        self.popups.push(popup);
    }

    /// Drop popups whose display time is over
    pub fn purge_expired(&mut self, now: DateTime<Utc>) {
        self.popups.retain(|p| p.expires_at > now);
    }

    pub fn active(&self, now: DateTime<Utc>) -> Vec<Popup> {
        self.popups.iter().filter(|p| p.expires_at > now).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn critical(title: &str, message: &str) -> NewAlert {
        NewAlert {
            severity: AlertSeverity::Critical,
            title: title.to_string(),
            message: message.to_string(),
            location: "Hospital A - ICU".to_string(),
            source: PredictionSource::Fallback,
        }
    }

    #[test]
    fn test_duplicate_title_and_message_is_dropped() {
        let mut log = AlertLog::default();
        let now = Utc::now();
        assert_eq!(log.insert(critical("CRITICAL DEVICE ALERT", "Lifepak 20 requires immediate inspection"), now), Some(1));
        assert_eq!(log.insert(critical("CRITICAL DEVICE ALERT", "Lifepak 20 requires immediate inspection"), now), None);
        assert_eq!(log.len(), 1);

        // same title, different message is a distinct alert
        assert!(log.insert(critical("CRITICAL DEVICE ALERT", "GE Aisys requires immediate inspection"), now).is_some());
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_every_logged_alert_is_critical() {
        let mut log = AlertLog::new(10);
        let now = Utc::now();
        log.insert(critical("a", "1"), now);
        log.insert(critical("a", "2"), now);
        assert_eq!(log.critical_count(), log.len());

        let json = serde_json::to_value(log.iter().next().unwrap()).unwrap();
        assert_eq!(json["severity"], "critical");
    }

    #[test]
    fn test_log_evicts_oldest_past_capacity() {
        let mut log = AlertLog::default();
        let now = Utc::now();
        for i in 0..50 {
            log.insert(critical("alert", &format!("message {}", i)), now);
        }
        assert_eq!(log.len(), 50);

        log.insert(critical("alert", "message 50"), now);
        assert_eq!(log.len(), 50);
        assert!(log.iter().all(|a| a.message != "message 0"));
        assert_eq!(log.iter().next().map(|a| a.message.as_str()), Some("message 50"));
        assert_eq!(log.iter().last().map(|a| a.message.as_str()), Some("message 1"));
    }

    #[test]
    fn test_ids_increase_with_creation_order() {
        let mut log = AlertLog::new(10);
        let now = Utc::now();
        let first = log.insert(critical("a", "1"), now).unwrap();
        let second = log.insert(critical("a", "2"), now).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_dismiss_and_clear() {
        let mut log = AlertLog::new(10);
        let now = Utc::now();
        let id = log.insert(critical("a", "1"), now).unwrap();
        log.insert(critical("a", "2"), now);
        assert_eq!(log.critical_count(), 2);

        assert!(log.dismiss(id));
        assert!(!log.dismiss(id));
        assert_eq!(log.len(), 1);

        // a dismissed alert can be logged again
        assert!(log.insert(critical("a", "1"), now).is_some());

        log.clear();
        assert_eq!(log.len(), 0);
    }

    #[test]
    fn test_popups_expire() {
        let now = Utc::now();
        let mut tray = PopupTray::new(Duration::seconds(10));
        tray.push(Popup {
            alert_id: Some(1),
            device_id: 3,
            device_name: "Hamilton G5".to_string(),
            device_type: "Patient Ventilator".to_string(),
            location: "Hospital A - ICU".to_string(),
            risk_level: RiskLevel::High,
            temperature: 39.2,
            vibration: 0.5,
            offline: true,
            play_sound: false,
            expires_at: now + tray.ttl(),
        });

        assert_eq!(tray.active(now + Duration::seconds(9)).len(), 1);
        assert!(tray.active(now + Duration::seconds(10)).is_empty());

        tray.purge_expired(now + Duration::seconds(11));
        assert!(tray.popups.is_empty());
    }
}
