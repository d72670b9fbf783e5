//! Background pinger keeping the liveness flag fresh between scrapes.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::collector::{ScrapeTrigger, SharedCollector};

/// Periodically scrapes the broker and discards the output.
///
/// The first ping happens immediately, then once per interval. A scrape that
/// outlasts the interval delays the next tick instead of bunching them up.
pub struct Pinger {
    collector: SharedCollector,
    interval: Duration,
}

impl Pinger {
    /// Create a new pinger.
    pub fn new(collector: SharedCollector, interval: Duration) -> Self {
        Self {
            collector,
            interval,
        }
    }

    /// Ping until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            "Starting broker pinger"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Failures are already logged by the collector.
                    if self.collector.scrape(ScrapeTrigger::Pinger).await.is_err() {
                        debug!("Ping failed, broker marked down");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Broker pinger stopped");
    }
}
