// Shared read-through job cache

use crate::domain::{Job, JobId};
use crate::port::TimeProvider;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A cached job plus when it arrived
#[derive(Debug, Clone, PartialEq)]
pub struct CachedJob {
    pub job: Job,
    /// Position in response arrival order across all writers
    pub arrival: u64,
    /// Wall-clock time the response was applied (epoch ms)
    pub observed_at: i64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<JobId, CachedJob>,
    next_arrival: u64,
}

/// Cache keyed by job id, shared by every subscription and action.
///
/// Last write wins by response *arrival* order: a store always replaces the
/// entry, regardless of when the request that produced it was issued.
///
/// Entries are only dropped by [`JobCache::remove`] and
/// [`JobCache::prune_settled`]; non-terminal jobs are never evicted.
pub struct JobCache {
    inner: Mutex<Inner>,
    time_provider: Arc<dyn TimeProvider>,
}

impl JobCache {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            time_provider,
        }
    }

    /// Apply a response; returns its arrival sequence number
    pub fn store(&self, job: Job) -> u64 {
        let observed_at = self.time_provider.now_millis();
        let mut inner = self.inner.lock();
        inner.next_arrival += 1;
        let arrival = inner.next_arrival;
        inner.entries.insert(
            job.id.clone(),
            CachedJob {
                job,
                arrival,
                observed_at,
            },
        );
        arrival
    }

    pub fn get(&self, job_id: &str) -> Option<CachedJob> {
        self.inner.lock().entries.get(job_id).cloned()
    }

    pub fn job(&self, job_id: &str) -> Option<Job> {
        self.get(job_id).map(|c| c.job)
    }

    /// Drop terminal entries observed more than `max_age_ms` ago.
    /// Returns how many were removed.
    pub fn prune_settled(&self, max_age_ms: i64) -> usize {
        let cutoff = self.time_provider.now_millis().saturating_sub(max_age_ms);
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, cached| !(cached.job.is_terminal() && cached.observed_at < cutoff));
        before - inner.entries.len()
    }

    pub fn remove(&self, job_id: &str) -> Option<CachedJob> {
        self.inner.lock().entries.remove(job_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
