//! Queue collector: fetches the listing, renders it and tracks broker liveness.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use tracing::{error, info};

use crate::client::{BrokerClient, FetchError};
use crate::mapping::render_queues;

/// What caused a scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeTrigger {
    /// A request on the metrics endpoint.
    Http,
    /// The background pinger.
    Pinger,
}

impl fmt::Display for ScrapeTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeTrigger::Http => write!(f, "http"),
            ScrapeTrigger::Pinger => write!(f, "pinger"),
        }
    }
}

/// Collector statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorStats {
    /// Total scrapes attempted.
    pub scrapes: u64,
    /// Scrapes that failed to fetch or parse the listing.
    pub scrapes_failed: u64,
    /// Queues exported by the last successful scrape.
    pub queues_exported: u64,
    /// Ephemeral queues skipped by the last successful scrape.
    pub queues_skipped: u64,
}

/// Fetches queue statistics on demand. Holds no cached data.
///
/// The liveness flag starts out false and reflects the most recent scrape,
/// whichever task ran it.
pub struct QueueCollector {
    client: BrokerClient,
    up: AtomicBool,
    scrapes: AtomicU64,
    scrapes_failed: AtomicU64,
    queues_exported: AtomicU64,
    queues_skipped: AtomicU64,
}

impl QueueCollector {
    /// Create a new collector.
    pub fn new(client: BrokerClient) -> Self {
        Self {
            client,
            up: AtomicBool::new(false),
            scrapes: AtomicU64::new(0),
            scrapes_failed: AtomicU64::new(0),
            queues_exported: AtomicU64::new(0),
            queues_skipped: AtomicU64::new(0),
        }
    }

    /// Fetch the queue listing once and render it in exposition format.
    ///
    /// Updates the liveness flag with the outcome.
    pub async fn scrape(&self, trigger: ScrapeTrigger) -> Result<String, FetchError> {
        let started = Instant::now();
        self.scrapes.fetch_add(1, Ordering::Relaxed);

        match self.client.fetch_queues().await {
            Ok(queues) => {
                let skipped = queues.iter().filter(|q| q.is_ephemeral()).count() as u64;
                let exported = queues.len() as u64 - skipped;
                let output = render_queues(&queues);

                self.queues_exported.store(exported, Ordering::Relaxed);
                self.queues_skipped.store(skipped, Ordering::Relaxed);
                self.up.store(true, Ordering::SeqCst);

                info!(
                    trigger = %trigger,
                    queues = exported,
                    skipped,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Fetched queue metrics"
                );
                Ok(output)
            }
            Err(e) => {
                self.scrapes_failed.fetch_add(1, Ordering::Relaxed);
                self.up.store(false, Ordering::SeqCst);

                error!(
                    trigger = %trigger,
                    error = %e.chain(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Error fetching metrics"
                );
                Err(e)
            }
        }
    }

    /// Whether the most recent scrape succeeded.
    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }

    /// Get collector statistics.
    pub fn stats(&self) -> CollectorStats {
        CollectorStats {
            scrapes: self.scrapes.load(Ordering::Relaxed),
            scrapes_failed: self.scrapes_failed.load(Ordering::Relaxed),
            queues_exported: self.queues_exported.load(Ordering::Relaxed),
            queues_skipped: self.queues_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Create a shareable collector handle.
pub type SharedCollector = Arc<QueueCollector>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrokerSettings;
    use std::time::Duration;
    use url::Url;

    fn unreachable_collector() -> QueueCollector {
        let settings = BrokerSettings::new(Url::parse("http://127.0.0.1:1").unwrap())
            .with_timeout(Duration::from_secs(2));
        QueueCollector::new(BrokerClient::new(settings).unwrap())
    }

    #[test]
    fn test_starts_down_with_empty_stats() {
        let collector = unreachable_collector();

        assert!(!collector.is_up());
        assert_eq!(collector.stats(), CollectorStats::default());
    }

    #[tokio::test]
    async fn test_failed_scrape_counts_and_stays_down() {
        let collector = unreachable_collector();

        assert!(collector.scrape(ScrapeTrigger::Http).await.is_err());
        assert!(collector.scrape(ScrapeTrigger::Pinger).await.is_err());

        assert!(!collector.is_up());
        let stats = collector.stats();
        assert_eq!(stats.scrapes, 2);
        assert_eq!(stats.scrapes_failed, 2);
        assert_eq!(stats.queues_exported, 0);
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(ScrapeTrigger::Http.to_string(), "http");
        assert_eq!(ScrapeTrigger::Pinger.to_string(), "pinger");
    }
}
