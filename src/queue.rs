//! The retrying work queue at the heart of a collection run.
//!
//! `DumpQueue` drains the expanded set of dump objects across up to
//! `attempts` passes. Within a pass, the first network failure for a host
//! circuit-breaks every other object of that host: they are re-queued for the
//! next pass without paying the dial-out cost. The offline set is cleared at
//! every pass boundary, so a host that recovers is retried normally. Objects
//! still pending after the last pass are demoted to offline and yielded
//! exactly once more so the offline-marker driver can record them.
//!
//! The queue owns all object mutation; drivers and the manager only feed
//! failures back through [`DumpQueue::report_network_failure`].

use std::collections::{HashSet, VecDeque};

use log::debug;

use crate::config::DumpConfig;
use crate::models::{DumpObject, ObjectStatus};

/// Pending dump objects plus the retry bookkeeping for one run.
#[derive(Debug, Default)]
pub struct DumpQueue {
    /// Objects eligible for dispatch in the current pass, FIFO.
    pending: VecDeque<DumpObject>,
    /// Objects postponed to the next pass.
    retry: VecDeque<DumpObject>,
    /// Hosts that failed earlier in the current pass.
    offline_hosts: HashSet<String>,
    /// Passes completed so far.
    pass: u32,
    max_attempts: u32,
}

impl DumpQueue {
    /// Expands the configuration's role tree into the initial object set:
    /// one object per role x declared object x host, in config order.
    pub fn from_config(config: &DumpConfig) -> Self {
        let attempts = config.attempts();
        let mut pending = VecDeque::new();
        for (role, role_config) in &config.dump {
            let hosts = role_config.effective_hosts();
            for entry in &role_config.objects {
                for host in &hosts {
                    debug!(
                        "Queueing {} object for role {} on {}",
                        entry.resource.kind(),
                        role,
                        host.report_name()
                    );
                    let mut object =
                        DumpObject::new(entry.resource.clone(), host.clone(), attempts);
                    object.timeout = entry.timeout;
                    pending.push_back(object);
                }
            }
        }
        Self {
            pending,
            retry: VecDeque::new(),
            offline_hosts: HashSet::new(),
            pass: 0,
            max_attempts: attempts,
        }
    }

    /// Next object to dispatch, or `None` once the run is fully drained.
    ///
    /// Successfully processed objects are simply not re-enqueued by the
    /// caller; failed ones come back through `report_network_failure`.
    pub fn next(&mut self) -> Option<DumpObject> {
        while self.pass < self.max_attempts {
            if let Some(object) = self.pending.pop_front() {
                let circuit_broken = object
                    .network_address()
                    .map(|addr| self.offline_hosts.contains(addr))
                    .unwrap_or(false);
                if circuit_broken {
                    debug!(
                        "Host {} already failed this pass, postponing {} object",
                        object.host.report_name(),
                        object.resource.kind()
                    );
                    self.retry.push_back(object);
                    continue;
                }
                return Some(object);
            }

            // Pass boundary: the circuit breaker resets and whatever was
            // postponed becomes the next pass's pending set.
            self.pass += 1;
            self.offline_hosts.clear();
            if self.retry.is_empty() {
                return None;
            }
            std::mem::swap(&mut self.pending, &mut self.retry);
        }

        // All passes used up. Anything left is irrecoverable for this run:
        // demote it and yield it once more for the offline-marker driver.
        let mut object = self.pending.pop_front().or_else(|| self.retry.pop_front())?;
        debug!(
            "Object for {} exhausted all {} passes, demoting to offline",
            object.host.report_name(),
            self.max_attempts
        );
        object.status = ObjectStatus::Offline;
        Some(object)
    }

    /// Feedback channel for the orchestrator: dispatching `object` raised an
    /// unreachable-host failure. Consumes one attempt, re-queues the object
    /// for the next pass and circuit-breaks its host for the rest of this one.
    pub fn report_network_failure(&mut self, mut object: DumpObject) {
        if object.status == ObjectStatus::Offline {
            // Terminal objects are never re-attempted regardless of outcome.
            return;
        }
        if let Some(address) = object.network_address().map(str::to_owned) {
            debug!(
                "Remote host {} is unreachable, postponing its objects",
                address
            );
            self.offline_hosts.insert(address);
        }
        object.attempts_remaining = object.attempts_remaining.saturating_sub(1);
        self.retry.push_back(object);
    }

    /// Objects not yet dispatched in the current pass.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
