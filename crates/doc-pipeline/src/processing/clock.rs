//! Time source for record timestamps

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Supplies the write time stamped on each record
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that starts at a fixed instant and advances by `step` on every read
#[derive(Debug)]
pub struct SteppingClock {
    next: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock();
        let now = *next;
        *next = now + self.step;
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stepping_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = SteppingClock::new(start, Duration::milliseconds(5));

        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + Duration::milliseconds(5));
        assert_eq!(clock.now(), start + Duration::milliseconds(10));
    }
}
