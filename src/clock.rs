use chrono::{DateTime, Utc};
use std::fmt;

/// Time source used by every service that reads or stamps the current time.
///
/// Replenishment math depends on "now" (trailing sales windows, stock-out
/// horizons, approval stamps), so production code injects [`SystemClock`]
/// and tests pin time with [`FixedClock`].
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a known instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for FixedClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedClock({})", self.0.to_rfc3339())
    }
}
