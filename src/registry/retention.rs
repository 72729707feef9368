//! Retention policy for task records.
//!
//! Two windows apply. Every record is dropped once it is older than
//! `max_total_age` (measured from `created_at`). Terminal records go sooner,
//! after `max_terminal_grace` measured from `updated_at`.

use std::time::Duration;

use crate::domain::TaskRecord;
use crate::error::{CvAgentError, Result};

/// Default upper bound on the lifetime of any record
pub const DEFAULT_MAX_TOTAL_AGE: Duration = Duration::from_secs(60 * 60);

/// Default time a terminal record stays visible to pollers
pub const DEFAULT_MAX_TERMINAL_GRACE: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_total_age: Duration,
    max_terminal_grace: Duration,
}

impl RetentionPolicy {
    /// Build a policy; the grace period may not exceed the total age
    pub fn new(max_total_age: Duration, max_terminal_grace: Duration) -> Result<Self> {
        if max_terminal_grace > max_total_age {
            return Err(CvAgentError::Config(format!(
                "max_terminal_grace ({}s) exceeds max_total_age ({}s)",
                max_terminal_grace.as_secs(),
                max_total_age.as_secs()
            )));
        }
        Ok(Self {
            max_total_age,
            max_terminal_grace,
        })
    }

    pub fn max_total_age(&self) -> Duration {
        self.max_total_age
    }

    pub fn max_terminal_grace(&self) -> Duration {
        self.max_terminal_grace
    }

    /// Whether `record` should be gone at time `now_ms`
    pub fn is_expired(&self, record: &TaskRecord, now_ms: i64) -> bool {
        if now_ms - record.created_at > as_ms(self.max_total_age) {
            return true;
        }
        record.is_terminal() && now_ms - record.updated_at > as_ms(self.max_terminal_grace)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_total_age: DEFAULT_MAX_TOTAL_AGE,
            max_terminal_grace: DEFAULT_MAX_TERMINAL_GRACE,
        }
    }
}

fn as_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
