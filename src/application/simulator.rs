// Telemetry simulator - bounded random walk per tick
use crate::domain::fleet::Fleet;
use crate::domain::telemetry::Telemetry;
use chrono::{DateTime, Utc};
use rand::Rng;

pub const RUNTIME_STEP_HOURS: f64 = 0.5;

/// Advance every device that has no prediction in flight. Returns how many moved.
pub fn advance<R: Rng + ?Sized>(fleet: &mut Fleet, rng: &mut R, now: DateTime<Utc>) -> usize {
    let mut advanced = 0;
    for device in fleet.iter_mut().filter(|d| !d.is_updating) {
        step(&mut device.telemetry, rng);
        device.last_update = now;
        advanced += 1;
    }
    advanced
}

fn step<R: Rng + ?Sized>(telemetry: &mut Telemetry, rng: &mut R) {
    telemetry.temperature += rng.gen_range(-1.0..1.0);
    telemetry.vibration += rng.gen_range(-0.05..0.05);
    telemetry.error_logs += rng.gen_range(0..=2);
    telemetry.runtime_hours += RUNTIME_STEP_HOURS;
    telemetry.pressure += rng.gen_range(-2.5..2.5);
    telemetry.current_draw += rng.gen_range(-0.25..0.25);
    telemetry.clamp();
    debug_assert!(telemetry.is_within_bounds());
}
