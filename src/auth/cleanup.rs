//! Background sweep for expired tokens.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error};

use super::AuthManager;

pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Spawn a task that calls `cleanup_expired` every `period`.
///
/// The first sweep runs one period after start-up. Failures are logged and
/// the loop keeps going.
pub fn spawn_cleanup_task(
    manager: Arc<AuthManager>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    let period = if period.is_zero() {
        Duration::from_secs(1)
    } else {
        period
    };

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match manager.cleanup_expired().await {
                Ok(removed) => debug!(removed, "token cleanup finished"),
                Err(err) => error!("token cleanup failed: {err}"),
            }
        }
    })
}
