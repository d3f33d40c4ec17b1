use super::PageId;
use crate::transaction::TransactionId;
use itertools::Itertools;
use log::warn;
use parking_lot::{Condvar, Mutex};
use rand::Rng;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

struct PageLock {
    mode: LockMode,
    holders: HashSet<TransactionId>,
}

#[derive(Default)]
struct LockState {
    /// PageId -> current lock; absent means unlocked.
    locks: HashMap<PageId, PageLock>,
    /// TransactionId -> pages it locks. Authoritative release set:
    /// `transaction_complete` walks it.
    held: HashMap<TransactionId, HashSet<PageId>>,
}

/// Per-page two-phase locking. S is compatible with S only; X is
/// exclusive. The sole S holder may upgrade in place. Waits block on one
/// monitor; deadlocks resolve by randomized timeout.
pub struct LockManager {
    state: Mutex<LockState>,
    waiters: Condvar,
    timeout_ms: u64,
}

impl LockManager {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            waiters: Condvar::new(),
            timeout_ms,
        }
    }

    /// Acquire with a timeout drawn uniformly from `[0, timeout_ms]`, so
    /// concurrent conflicting transactions pick different victims and
    /// progress probabilistically.
    pub fn acquire(
        &self,
        tid: TransactionId,
        pid: PageId,
        mode: LockMode,
    ) -> Result<(), LockError> {
        let timeout = Duration::from_millis(rand::thread_rng().gen_range(0..=self.timeout_ms));
        self.acquire_with_timeout(tid, pid, mode, timeout)
    }

    pub fn acquire_with_timeout(
        &self,
        tid: TransactionId,
        pid: PageId,
        mode: LockMode,
        timeout: Duration,
    ) -> Result<(), LockError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if Self::try_grant(&mut state, tid, pid, mode) {
                state.held.entry(tid).or_default().insert(pid);
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!("{} timed out waiting for {:?} on {}", tid, mode, pid);
                return Err(LockError::Deadlock(tid, pid));
            }
            self.waiters.wait_until(&mut state, deadline);
        }
    }

    fn try_grant(state: &mut LockState, tid: TransactionId, pid: PageId, mode: LockMode) -> bool {
        match state.locks.entry(pid) {
            Entry::Vacant(entry) => {
                entry.insert(PageLock {
                    mode,
                    holders: HashSet::from([tid]),
                });
                true
            }
            Entry::Occupied(mut entry) => {
                let lock = entry.get_mut();
                match (lock.mode, mode) {
                    // an X holder already has every right on the page
                    (LockMode::Exclusive, _) => lock.holders.contains(&tid),
                    (LockMode::Shared, LockMode::Shared) => {
                        lock.holders.insert(tid);
                        true
                    }
                    (LockMode::Shared, LockMode::Exclusive) => {
                        // upgrade iff the requester is the sole holder
                        if lock.holders.len() == 1 && lock.holders.contains(&tid) {
                            lock.mode = LockMode::Exclusive;
                            true
                        } else {
                            false
                        }
                    }
                }
            }
        }
    }

    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let mut state = self.state.lock();
        Self::release_locked(&mut state, tid, pid);
        self.waiters.notify_all();
    }

    pub fn release_all(&self, tid: TransactionId) {
        let mut state = self.state.lock();
        for pid in state.held.remove(&tid).unwrap_or_default() {
            if let Entry::Occupied(mut entry) = state.locks.entry(pid) {
                entry.get_mut().holders.remove(&tid);
                if entry.get().holders.is_empty() {
                    entry.remove();
                }
            }
        }
        self.waiters.notify_all();
    }

    fn release_locked(state: &mut LockState, tid: TransactionId, pid: PageId) {
        if let Entry::Occupied(mut entry) = state.locks.entry(pid) {
            entry.get_mut().holders.remove(&tid);
            if entry.get().holders.is_empty() {
                entry.remove();
            }
        }
        if let Some(held) = state.held.get_mut(&tid) {
            held.remove(&pid);
            if held.is_empty() {
                state.held.remove(&tid);
            }
        }
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.state
            .lock()
            .locks
            .get(&pid)
            .map(|lock| lock.holders.contains(&tid))
            .unwrap_or(false)
    }

    /// Pages currently locked by `tid`, in page order.
    pub fn pages_of(&self, tid: TransactionId) -> Vec<PageId> {
        self.state
            .lock()
            .held
            .get(&tid)
            .map(|held| {
                held.iter()
                    .copied()
                    .sorted_by_key(|pid| (pid.table, pid.page_no))
                    .collect_vec()
            })
            .unwrap_or_default()
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    #[error("{0} aborted: lock acquisition on {1} timed out")]
    Deadlock(TransactionId, PageId),
}
