use anyhow::Result;
use tokio::time::{interval, sleep};
use tracing::{info, instrument, warn};

use crate::core::config::ScraperConfig;
use crate::extract::{extract_tokens, DedupTracker};
use crate::ingest::relay_client::RelayClient;
use crate::ingest::source::SnapshotSource;

/// Per-tick observability counters. No behavioral weight.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickSummary {
    pub found: usize,
    pub admitted: usize,
    pub delivered: usize,
}

/// The scraper's single cooperative loop: snapshot, extract, admit, deliver,
/// once per tick, one tick at a time.
///
/// Source, tracker, and client are constructed once at process start and
/// injected here. A fatal source error kills the session and re-opens the
/// source after a backoff; the tracker survives every restart, so a token
/// is only ever offered to the relay once per process lifetime.
pub struct IngestionLoop {
    source: Box<dyn SnapshotSource>,
    tracker: DedupTracker,
    client: RelayClient,
    config: ScraperConfig,
}

impl IngestionLoop {
    pub fn new(
        source: Box<dyn SnapshotSource>,
        tracker: DedupTracker,
        client: RelayClient,
        config: ScraperConfig,
    ) -> Self {
        Self {
            source,
            tracker,
            client,
            config,
        }
    }

    /// Runs forever; only process shutdown stops it.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            if let Err(e) = self.run_session().await {
                warn!(
                    error = %e,
                    backoff_secs = self.config.restart_backoff.as_secs(),
                    "scrape session died, restarting from scratch"
                );
                sleep(self.config.restart_backoff).await;
            }
        }
    }

    /// One source lifetime: open, settle, then tick until something fatal.
    async fn run_session(&mut self) -> Result<()> {
        self.source.open().await?;
        info!(
            settle_secs = self.config.settle_delay.as_secs(),
            "source open, waiting for page to settle"
        );
        sleep(self.config.settle_delay).await;

        let mut ticker = interval(self.config.tick_interval);
        loop {
            ticker.tick().await;
            self.run_once().await?;
        }
    }

    /// A single snapshot-extract-admit-deliver cycle. Snapshot failure is
    /// fatal to the session; delivery failure is isolated to its record.
    #[instrument(skip(self))]
    pub async fn run_once(&mut self) -> Result<TickSummary> {
        let snapshot = self.source.acquire().await?;

        let mut summary = TickSummary::default();
        for candidate in extract_tokens(&snapshot) {
            summary.found += 1;
            if !self.tracker.admit(&candidate) {
                continue;
            }
            summary.admitted += 1;

            match self.client.deliver(&candidate).await {
                Ok(_) => {
                    summary.delivered += 1;
                    info!(
                        contract = %candidate.contract,
                        name = %candidate.name,
                        symbol = candidate.symbol.as_deref().unwrap_or(""),
                        "new token relayed"
                    );
                }
                Err(e) => {
                    // The record stays admitted: it will not be re-offered,
                    // which makes this a permanent loss for that token.
                    warn!(
                        contract = %candidate.contract,
                        error = %e,
                        "delivery failed, record dropped"
                    );
                }
            }
        }

        info!(
            found = summary.found,
            admitted = summary.admitted,
            delivered = summary.delivered,
            total_admitted = self.tracker.admitted_count(),
            "tick complete"
        );
        Ok(summary)
    }
}
