//! Periodic timeout sweeper for suspended polls.
//!
//! [`spawn_sweeper`] runs [`Hub::sweep`] on a fixed interval so no poll
//! stays suspended longer than the hub's poll timeout plus one interval.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::hub::Hub;

/// Smallest interval accepted; `tokio::time::interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Spawn the sweeper on a background Tokio task.
///
/// The task only holds a weak reference to the hub and exits on its own
/// once the hub is dropped. Callers may also abort the returned handle
/// during shutdown.
///
/// Callers that build a hub directly skip config validation, so a zero
/// `interval` is raised to one millisecond here instead of panicking.
pub fn spawn_sweeper(hub: &Arc<Hub>, interval: Duration) -> JoinHandle<()> {
    let hub: Weak<Hub> = Arc::downgrade(hub);
    let interval = interval.max(MIN_SWEEP_INTERVAL);

    info!(?interval, "Poll sweeper started");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // A delayed tick reports its scheduled deadline, not the
            // current time, so age is judged against a fresh reading.
            ticker.tick().await;
            let Some(hub) = hub.upgrade() else {
                debug!("Hub dropped, poll sweeper exiting");
                return;
            };
            hub.sweep(Instant::now());
        }
    })
}
