//! In-memory summary store
//!
//! `DashMap` memo table plus an in-progress set. A key is claimed before
//! its summary is computed and released afterwards; a request for a claimed
//! key is a call cycle and answers `None` instead of recursing.

use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::error::Result;
use crate::features::thread_safety::domain::Summary;
use crate::features::thread_safety::ports::SummaryStore;
use crate::shared::models::ProcName;

/// Default capacity of the summary table
const SUMMARY_STORE_CAPACITY: usize = 1_024;

pub struct InMemorySummaryStore {
    summaries: DashMap<ProcName, Arc<Summary>>,
    in_progress: Mutex<FxHashSet<ProcName>>,
    computations: AtomicUsize,
}

impl Default for InMemorySummaryStore {
    fn default() -> Self {
        Self::with_capacity(SUMMARY_STORE_CAPACITY)
    }
}

impl InMemorySummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            summaries: DashMap::with_capacity(capacity),
            in_progress: Mutex::new(FxHashSet::default()),
            computations: AtomicUsize::new(0),
        }
    }

    /// Number of times a summary was actually computed
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    pub fn insert(&self, name: ProcName, summary: Summary) -> Arc<Summary> {
        let summary = Arc::new(summary);
        self.summaries.insert(name, Arc::clone(&summary));
        summary
    }

    pub fn clear(&self) {
        self.summaries.clear();
        self.in_progress.lock().clear();
    }

    /// Claim `name` for computation; false if already claimed
    fn claim(&self, name: &ProcName) -> bool {
        self.in_progress.lock().insert(name.clone())
    }

    fn release(&self, name: &ProcName) {
        self.in_progress.lock().remove(name);
    }
}

impl SummaryStore for InMemorySummaryStore {
    fn get(&self, name: &ProcName) -> Option<Arc<Summary>> {
        self.summaries.get(name).map(|entry| Arc::clone(&entry))
    }

    fn get_or_compute(
        &self,
        name: &ProcName,
        compute: &mut dyn FnMut() -> Result<Summary>,
    ) -> Result<Option<Arc<Summary>>> {
        if let Some(summary) = self.get(name) {
            return Ok(Some(summary));
        }
        if !self.claim(name) {
            tracing::debug!(proc = %name, "summary requested during its own computation");
            return Ok(None);
        }
        // Another thread may have finished between the lookup and the claim
        if let Some(summary) = self.get(name) {
            self.release(name);
            return Ok(Some(summary));
        }

        let computed = compute();
        self.release(name);
        let summary = computed?;
        self.computations.fetch_add(1, Ordering::Relaxed);
        Ok(Some(self.insert(name.clone(), summary)))
    }

    fn snapshot(&self) -> BTreeMap<ProcName, Arc<Summary>> {
        self.summaries
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    fn len(&self) -> usize {
        self.summaries.len()
    }
}
