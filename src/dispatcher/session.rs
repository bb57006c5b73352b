use std::collections::HashMap;

use tracing::trace;

use crate::CapacityError;
use crate::EndpointKey;
use crate::JobDone;
use crate::Result;

/// Routing decision for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Queue the job on this worker
    Assigned(usize),
    /// Key backlog full, job dropped
    Throttled { worker: usize, outstanding: usize },
    /// Key overflowed too often: its session is dropped and a failure job
    /// goes to the worker that held it
    Escalate { worker: usize, attempts: u32 },
}

#[derive(Debug, Clone)]
struct Session {
    worker: usize,
    generation: u64,
    outstanding: usize,
    failures: u32,
}

/// Key to worker bindings plus per-worker and pool-wide backlog counters.
///
/// Owned by the dispatcher task alone.
#[derive(Debug)]
pub struct SessionTable {
    sessions: HashMap<EndpointKey, Session>,
    next_generation: u64,
    loads: Vec<usize>,
    total: usize,
    max_jobs: usize,
    max_key_count: usize,
    failure_threshold: u32,
}

impl SessionTable {
    pub fn new(
        workers: usize,
        max_jobs: usize,
        max_key_count: usize,
        failure_threshold: u32,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            next_generation: 1,
            loads: vec![0; workers.max(1)],
            total: 0,
            max_jobs,
            max_key_count,
            failure_threshold,
        }
    }

    /// Admits one job for `key`. Fails only when the pool-wide backlog is
    /// exhausted.
    pub fn admit(
        &mut self,
        key: &EndpointKey,
    ) -> Result<Admission> {
        if self.total >= self.max_jobs {
            return Err(CapacityError::GlobalBacklog {
                outstanding: self.total,
                limit: self.max_jobs,
            }
            .into());
        }

        let admission = match self.sessions.get_mut(key) {
            Some(s) if s.outstanding >= self.max_key_count => {
                s.failures += 1;
                if s.failures < self.failure_threshold {
                    return Ok(Admission::Throttled {
                        worker: s.worker,
                        outstanding: s.outstanding,
                    });
                }
                let (worker, attempts) = (s.worker, s.failures);
                self.sessions.remove(key);
                Admission::Escalate { worker, attempts }
            }
            Some(s) => {
                s.outstanding += 1;
                Admission::Assigned(s.worker)
            }
            None => {
                let worker = self.least_loaded();
                let generation = self.next_generation;
                self.next_generation += 1;
                self.sessions.insert(
                    key.clone(),
                    Session {
                        worker,
                        generation,
                        outstanding: 1,
                        failures: 0,
                    },
                );
                Admission::Assigned(worker)
            }
        };

        let worker = match admission {
            Admission::Assigned(w) | Admission::Escalate { worker: w, .. } => w,
            Admission::Throttled { worker, .. } => worker,
        };
        self.loads[worker] += 1;
        self.total += 1;
        trace!(key = %key, ?admission, total = self.total, "admitted");
        Ok(admission)
    }

    /// Accounts a finished job. The session closes when its last
    /// outstanding job completes. Completions stamped with another
    /// generation only release worker and pool load.
    pub fn complete(
        &mut self,
        done: &JobDone,
    ) {
        if let Some(load) = self.loads.get_mut(done.worker) {
            *load = load.saturating_sub(1);
        }
        self.total = self.total.saturating_sub(1);

        let close = match self.sessions.get_mut(&done.key) {
            Some(s) if s.generation == done.session => {
                s.outstanding = s.outstanding.saturating_sub(1);
                s.outstanding == 0
            }
            _ => false,
        };
        if close {
            self.sessions.remove(&done.key);
        }
    }

    fn least_loaded(&self) -> usize {
        self.loads
            .iter()
            .enumerate()
            .min_by_key(|(_, load)| **load)
            .map(|(w, _)| w)
            .unwrap_or_default()
    }

    pub fn load(
        &self,
        worker: usize,
    ) -> usize {
        self.loads.get(worker).copied().unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Generation of the open session for `key`. Generations start at 1, so
    /// a job stamped 0 never matches a session.
    pub fn generation(
        &self,
        key: &EndpointKey,
    ) -> Option<u64> {
        self.sessions.get(key).map(|s| s.generation)
    }

    /// Worker bound to `key` and its outstanding count, if a session is open.
    pub fn session(
        &self,
        key: &EndpointKey,
    ) -> Option<(usize, usize)> {
        self.sessions.get(key).map(|s| (s.worker, s.outstanding))
    }
}
