// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mission duration math and the injectable wall clock.

use chrono::{DateTime, Duration, Utc};

/// Wall-clock seam. Production uses [`SystemClock`]; tests freeze or step
/// time without touching the scheduler.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// No speed bonus may shorten a mission below half its base duration.
pub const MIN_DURATION_FACTOR: f64 = 0.5;

/// `max(base × (1 − bonus/100), base × 0.5)`, rounded to whole seconds.
/// The floor caps the benefit of any speed bonus at or above 100%.
pub fn adjusted_duration_seconds(base_seconds: i64, speed_bonus_percent: f64) -> i64 {
    let reduced = base_seconds as f64 * (1.0 - speed_bonus_percent / 100.0);
    let floor = base_seconds as f64 * MIN_DURATION_FACTOR;
    reduced.max(floor).round() as i64
}

/// Compute the `(start_time, end_time)` window for a mission started now.
pub fn mission_window(
    now: DateTime<Utc>,
    base_seconds: i64,
    speed_bonus_percent: f64,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let adjusted = adjusted_duration_seconds(base_seconds, speed_bonus_percent);
    (now, now + Duration::seconds(adjusted))
}
