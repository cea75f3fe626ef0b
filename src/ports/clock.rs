//! Clock port: source of the current instant.

use chrono::{DateTime, Utc};

/// Supplies "now" to the use cases so time-dependent rules stay testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
