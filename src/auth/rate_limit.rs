//! Per-client failed-attempt rate limiting.
//!
//! Flow Overview:
//! 1) Every failed PIN check calls `record_failure` for the client identifier.
//! 2) The 30th failure inside the window locks the identifier for 15 minutes.
//! 3) A successful PIN check calls `reset`, dropping the record entirely.
//!
//! Attempt counters decay lazily: a record whose last failure is older than
//! the window counts as zero attempts. Nothing is written back on read.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::warn;

use super::clock::Clock;

pub const ATTEMPT_WINDOW: Duration = Duration::from_secs(15 * 60);
pub const LOCKOUT_DURATION: Duration = Duration::from_secs(15 * 60);
pub const MAX_ATTEMPTS: u32 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after_seconds: u64 },
}

impl RateLimitDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub attempts: u32,
    pub last_attempt_at: i64,
    pub locked_until: Option<i64>,
}

impl RateLimitRecord {
    fn lock_remaining_ms(&self, now: i64) -> Option<i64> {
        self.locked_until
            .map(|until| until - now)
            .filter(|remaining| *remaining > 0)
    }

    fn window_expired(&self, now: i64) -> bool {
        now - self.last_attempt_at > window_ms()
    }

    /// Attempts still counting against the client at `now`.
    fn effective_attempts(&self, now: i64) -> u32 {
        if self.window_expired(now) {
            0
        } else {
            self.attempts
        }
    }
}

pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Decide whether `client_id` may attempt a PIN check right now.
    pub fn check(&self, client_id: &str) -> RateLimitDecision {
        let now = self.clock.now_ms();
        let records = self.records();
        let Some(record) = records.get(client_id) else {
            return RateLimitDecision::Allowed;
        };

        if let Some(remaining) = record.lock_remaining_ms(now) {
            return RateLimitDecision::Limited {
                retry_after_seconds: ceil_seconds(remaining),
            };
        }

        if record.effective_attempts(now) < MAX_ATTEMPTS {
            RateLimitDecision::Allowed
        } else {
            // Lock lapsed but the window has not; wait for the counter to decay.
            let remaining = record.last_attempt_at + window_ms() - now;
            RateLimitDecision::Limited {
                retry_after_seconds: ceil_seconds(remaining),
            }
        }
    }

    /// Count a failed attempt, locking the client once the ceiling is reached.
    pub fn record_failure(&self, client_id: &str) {
        let now = self.clock.now_ms();
        let mut records = self.records();
        let record = records
            .entry(client_id.to_string())
            .or_insert(RateLimitRecord {
                attempts: 0,
                last_attempt_at: now,
                locked_until: None,
            });

        record.attempts = record.effective_attempts(now).saturating_add(1);
        record.last_attempt_at = now;

        if record.attempts >= MAX_ATTEMPTS {
            record.locked_until = Some(now + lockout_ms());
            warn!(
                client_id,
                attempts = record.attempts,
                "client locked out after repeated PIN failures"
            );
        }
    }

    /// Forget everything about `client_id`.
    pub fn reset(&self, client_id: &str) {
        self.records().remove(client_id);
    }

    /// Snapshot of the stored record, if any.
    #[must_use]
    pub fn record(&self, client_id: &str) -> Option<RateLimitRecord> {
        self.records().get(client_id).copied()
    }

    /// Drop records that no longer affect any decision. Returns how many were removed.
    pub fn prune_stale(&self) -> usize {
        let now = self.clock.now_ms();
        let mut records = self.records();
        let before = records.len();
        records.retain(|_, record| {
            record.lock_remaining_ms(now).is_some() || !record.window_expired(now)
        });
        before - records.len()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, RateLimitRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("tracked_clients", &self.records().len())
            .finish_non_exhaustive()
    }
}

fn window_ms() -> i64 {
    i64::try_from(ATTEMPT_WINDOW.as_millis()).unwrap_or(i64::MAX)
}

fn lockout_ms() -> i64 {
    i64::try_from(LOCKOUT_DURATION.as_millis()).unwrap_or(i64::MAX)
}

fn ceil_seconds(ms: i64) -> u64 {
    let seconds = (ms.max(0) + 999) / 1000;
    u64::try_from(seconds).unwrap_or(0).max(1)
}
