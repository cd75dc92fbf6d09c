//! FIFO admission queue drained on a tick.
//!
//! Sessions that clear the login policy wait here so a burst of connections
//! starts at most `max_polls` verifications per tick. Each entry carries a
//! deferred start callback; [`AdmissionQueue::poll`] pops entries in insertion
//! order and runs the callbacks once the lock is released.

use crate::error::{constants, ProtocolError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::trace;

/// Deferred session start.
pub type AdmitCallback = Box<dyn FnOnce() + Send + 'static>;

struct QueueEntry {
    addr: IpAddr,
    ticket: u64,
    fingerprint: String,
    on_admit: AdmitCallback,
}

pub struct AdmissionQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
    // address -> ticket of its live entry; cancelled tickets stay in the deque
    // until a poll reaches them
    index: DashMap<IpAddr, u64>,
    next_ticket: AtomicU64,
}

impl std::fmt::Debug for AdmissionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionQueue")
            .field("queued", &self.index.len())
            .finish()
    }
}

impl Default for AdmissionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            index: DashMap::new(),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Queue a deferred start for `addr`.
    ///
    /// Returns `Ok(false)` without queuing when the address already waits.
    pub fn enqueue(&self, addr: IpAddr, fingerprint: &str, on_admit: AdmitCallback) -> Result<bool> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        match self.index.entry(addr) {
            Entry::Occupied(_) => return Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(ticket);
            }
        }

        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(_) => {
                self.index.remove(&addr);
                return Err(ProtocolError::Custom(constants::ERR_LOCK_POISONED.to_string()));
            }
        };
        entries.push_back(QueueEntry {
            addr,
            ticket,
            fingerprint: fingerprint.to_owned(),
            on_admit,
        });
        trace!(peer = %addr, ticket, queued = entries.len(), "Queued for verification");
        Ok(true)
    }

    /// Admit up to `max` live entries in FIFO order. Returns how many ran.
    pub fn poll(&self, max: usize) -> Result<usize> {
        let mut admitted = Vec::with_capacity(max.min(64));
        {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| ProtocolError::Custom(constants::ERR_LOCK_POISONED.to_string()))?;
            while admitted.len() < max {
                let Some(entry) = entries.pop_front() else {
                    break;
                };
                let live = self
                    .index
                    .remove_if(&entry.addr, |_, ticket| *ticket == entry.ticket)
                    .is_some();
                if live {
                    admitted.push(entry);
                }
            }
        }

        let count = admitted.len();
        for entry in admitted {
            trace!(peer = %entry.addr, fingerprint = %entry.fingerprint, "Admitted from queue");
            (entry.on_admit)();
        }
        Ok(count)
    }

    /// Forget the queued entry of `addr`. Its callback never runs.
    pub fn cancel(&self, addr: IpAddr) -> bool {
        self.index.remove(&addr).is_some()
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        self.index.contains_key(&addr)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    fn addr(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    fn recorder(log: &Arc<Mutex<Vec<u8>>>, id: u8) -> AdmitCallback {
        let log = log.clone();
        Box::new(move || log.lock().unwrap().push(id))
    }

    #[test]
    fn test_fifo_batches() {
        let queue = AdmissionQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for id in 0..5 {
            assert!(queue.enqueue(addr(id), "fp", recorder(&log, id)).unwrap());
        }

        assert_eq!(queue.poll(2).unwrap(), 2);
        assert_eq!(*log.lock().unwrap(), vec![0, 1]);
        assert_eq!(queue.poll(2).unwrap(), 2);
        assert_eq!(queue.poll(2).unwrap(), 1);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_duplicate_address_refused() {
        let queue = AdmissionQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        assert!(queue.enqueue(addr(1), "a", recorder(&log, 1)).unwrap());
        assert!(!queue.enqueue(addr(1), "b", recorder(&log, 2)).unwrap());
        assert_eq!(queue.len(), 1);
        queue.poll(10).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_cancelled_entries_do_not_use_the_batch() {
        let queue = AdmissionQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for id in 0..3 {
            queue.enqueue(addr(id), "fp", recorder(&log, id)).unwrap();
        }
        assert!(queue.cancel(addr(0)));
        assert_eq!(queue.poll(2).unwrap(), 2);
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_requeue_after_cancel() {
        let queue = AdmissionQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        queue.enqueue(addr(7), "fp", recorder(&log, 1)).unwrap();
        queue.cancel(addr(7));
        assert!(queue.enqueue(addr(7), "fp", recorder(&log, 2)).unwrap());
        assert_eq!(queue.poll(5).unwrap(), 1);
        assert_eq!(*log.lock().unwrap(), vec![2]);
    }
}
