use std::collections::HashSet;

use tracing::debug;

use crate::core::types::TokenRecord;

/// Process-lifetime record of every contract address ever admitted.
///
/// Identity is the canonical lowercase address alone: one emission ever per
/// contract, maximal noise suppression. The set is never pruned; a pipeline
/// restart keeps the same tracker so re-rendered cards stay silent. Only a
/// process restart forgets.
#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: HashSet<String>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True exactly once per identity key; records the key as a side effect.
    pub fn admit(&mut self, candidate: &TokenRecord) -> bool {
        let key = candidate.identity_key();
        let novel = self.seen.insert(key);
        if !novel {
            debug!(contract = %candidate.contract, "candidate already admitted, skipping");
        }
        novel
    }

    pub fn admitted_count(&self) -> usize {
        self.seen.len()
    }
}
