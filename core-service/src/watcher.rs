//! Periodic memory-pressure sampling.

use crate::registry::PlayerRegistry;
use bridge_traits::MemoryPressureMonitor;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Samples the monitor once and fans a pressure level out to every player.
/// Returns the number of players notified.
pub(crate) fn sample_once(monitor: &dyn MemoryPressureMonitor, registry: &PlayerRegistry) -> usize {
    match monitor.sample() {
        Ok(Some(level)) => {
            let notified = registry.notify_memory_pressure(level);
            debug!(?level, notified, "Memory pressure reported");
            notified
        }
        Ok(None) => {
            trace!("Memory pressure normal");
            0
        }
        Err(e) => {
            warn!(error = %e, "Memory pressure sampling failed");
            0
        }
    }
}

/// Spawn the watcher. It holds only a weak reference to the registry and
/// exits on its own once the registry is gone.
pub(crate) fn spawn(
    handle: &Handle,
    monitor: Arc<dyn MemoryPressureMonitor>,
    period: Duration,
    registry: Weak<PlayerRegistry>,
) -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    handle.spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(registry) = registry.upgrade() else {
                        break;
                    };
                    sample_once(monitor.as_ref(), &registry);
                }
            }
        }
        debug!("Memory watcher stopped");
    });

    cancel
}
