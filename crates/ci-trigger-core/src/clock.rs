//! Wall-clock source for commit labels.

use chrono::{DateTime, Local};

/// Supplies the current time to a trigger run.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// The host's local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Second-granularity label used to tell trigger commits apart.
///
/// Two runs inside the same wall-clock second share a label.
pub fn time_label(at: &DateTime<Local>) -> String {
    at.format("%H:%M:%S").to_string()
}
