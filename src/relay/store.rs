use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::core::types::{current_timestamp_millis, TokenRecord};

/// Bounded, time-windowed record store: newest first, capped by count and
/// by age. Count is enforced eagerly on append, age lazily on sweep, so
/// entries can overstay by at most one sweep interval.
#[derive(Debug)]
pub struct RelayStore {
    entries: RwLock<VecDeque<TokenRecord>>,
    max_entries: usize,
    max_age_millis: i64,
}

impl RelayStore {
    pub fn new(max_entries: usize, max_age: Duration) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            max_entries,
            max_age_millis: max_age.as_millis() as i64,
        }
    }

    /// Inserts at the head and drops from the tail until within the count
    /// ceiling.
    pub async fn append(&self, record: TokenRecord) {
        let mut entries = self.entries.write().await;
        entries.push_front(record);
        while entries.len() > self.max_entries {
            entries.pop_back();
        }
    }

    /// Removes every entry older than the age ceiling; returns how many
    /// went.
    pub async fn sweep(&self) -> usize {
        let now = current_timestamp_millis();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|record| record.age_millis(now) <= self.max_age_millis);
        before - entries.len()
    }

    /// Current contents by value, newest first. Later mutations are not
    /// visible through a returned snapshot.
    pub async fn snapshot(&self) -> Vec<TokenRecord> {
        self.entries.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Background eviction, decoupled from append so bursty ingestion can't
    /// starve it.
    pub fn start_sweeper(self: &Arc<Self>, sweep_interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                let removed = store.sweep().await;
                if removed > 0 {
                    debug!(removed = removed, "swept aged-out records");
                }
            }
        })
    }
}
