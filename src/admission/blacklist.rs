//! Failure scores per address.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Record {
    score: u32,
    expires_at: Instant,
}

/// Counts penalized failures per address.
///
/// Every new failure refreshes the expiry. Reads treat expired records as
/// absent; [`sweep`](Self::sweep) reclaims them.
#[derive(Debug)]
pub struct Blacklist {
    ttl: Duration,
    records: DashMap<IpAddr, Record>,
}

impl Blacklist {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            records: DashMap::new(),
        }
    }

    /// Add a strike against `addr` and return its new score.
    pub fn increment(&self, addr: IpAddr) -> u32 {
        self.increment_at(addr, Instant::now())
    }

    pub fn increment_at(&self, addr: IpAddr, now: Instant) -> u32 {
        let expires_at = now + self.ttl;
        match self.records.entry(addr) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                record.score = if record.expires_at > now {
                    record.score.saturating_add(1)
                } else {
                    1
                };
                record.expires_at = expires_at;
                record.score
            }
            Entry::Vacant(entry) => {
                entry.insert(Record { score: 1, expires_at });
                1
            }
        }
    }

    pub fn score(&self, addr: IpAddr) -> u32 {
        self.score_at(addr, Instant::now())
    }

    pub fn score_at(&self, addr: IpAddr, now: Instant) -> u32 {
        self.records
            .get(&addr)
            .filter(|record| record.expires_at > now)
            .map(|record| record.score)
            .unwrap_or(0)
    }

    /// Whether `addr` has reached `threshold` strikes.
    pub fn is_blacklisted(&self, addr: IpAddr, threshold: u32) -> bool {
        self.is_blacklisted_at(addr, threshold, Instant::now())
    }

    pub fn is_blacklisted_at(&self, addr: IpAddr, threshold: u32, now: Instant) -> bool {
        let score = self.score_at(addr, now);
        score > 0 && score >= threshold
    }

    pub fn remove(&self, addr: IpAddr) -> bool {
        self.records.remove(&addr).is_some()
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.expires_at > now);
        let removed = before.saturating_sub(self.records.len());
        if removed > 0 {
            debug!(removed, "Swept expired blacklist records");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    const ADDR: IpAddr = IpAddr::V6(Ipv6Addr::LOCALHOST);

    #[test]
    fn test_threshold() {
        let blacklist = Blacklist::new(Duration::from_secs(600));
        let now = Instant::now();
        assert!(!blacklist.is_blacklisted_at(ADDR, 2, now));
        assert_eq!(blacklist.increment_at(ADDR, now), 1);
        assert!(!blacklist.is_blacklisted_at(ADDR, 2, now));
        assert_eq!(blacklist.increment_at(ADDR, now), 2);
        assert!(blacklist.is_blacklisted_at(ADDR, 2, now));
    }

    #[test]
    fn test_expired_score_restarts() {
        let blacklist = Blacklist::new(Duration::from_secs(10));
        let now = Instant::now();
        blacklist.increment_at(ADDR, now);
        blacklist.increment_at(ADDR, now);
        let later = now + Duration::from_secs(11);
        assert_eq!(blacklist.score_at(ADDR, later), 0);
        assert_eq!(blacklist.increment_at(ADDR, later), 1);
    }

    #[test]
    fn test_zero_threshold_needs_a_record() {
        let blacklist = Blacklist::new(Duration::from_secs(10));
        let now = Instant::now();
        assert!(!blacklist.is_blacklisted_at(ADDR, 0, now));
        blacklist.increment_at(ADDR, now);
        assert!(blacklist.is_blacklisted_at(ADDR, 0, now));
    }

    #[test]
    fn test_sweep() {
        let blacklist = Blacklist::new(Duration::from_secs(10));
        let now = Instant::now();
        blacklist.increment_at(ADDR, now);
        assert_eq!(blacklist.sweep_at(now + Duration::from_secs(5)), 0);
        assert_eq!(blacklist.sweep_at(now + Duration::from_secs(10)), 1);
        assert!(blacklist.is_empty());
    }
}
