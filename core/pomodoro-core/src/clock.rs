//! The only source of "now" for the reducer and session service (spec §4.A).
//!
//! Durations are tracked in whole seconds throughout the core, so the clock
//! truncates to second granularity on every read.

use chrono::{DateTime, SubsecRound, Utc};

pub trait Clock: std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the real OS clock, truncated to second granularity.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}

/// A clock fixed to a configured instant, used by the reducer and service
/// test suites. `advance` moves it forward without needing the real clock.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: std::cell::Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        FixedClock {
            now: std::cell::Cell::new(now.trunc_subsecs(0)),
        }
    }

    pub fn advance(&self, seconds: i64) {
        self.now
            .set(self.now.get() + chrono::Duration::seconds(seconds));
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now.trunc_subsecs(0));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_advances_by_seconds() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        clock.advance(300);
        assert_eq!(
            clock.now(),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap()
        );
    }
}
