//! Engine counters, read by the transport's metrics endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RoutingStats {
    pub registrations: AtomicU64,
    pub duplicate_registrations: AtomicU64,
    pub rejected_registrations: AtomicU64,
    pub resolutions: AtomicU64,
    pub failed_resolutions: AtomicU64,
    pub cas_conflicts: AtomicU64,
}

/// Point-in-time copy of [`RoutingStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingStatsSnapshot {
    pub registrations: u64,
    pub duplicate_registrations: u64,
    pub rejected_registrations: u64,
    pub resolutions: u64,
    pub failed_resolutions: u64,
    pub cas_conflicts: u64,
}

impl RoutingStats {
    pub fn snapshot(&self) -> RoutingStatsSnapshot {
        RoutingStatsSnapshot {
            registrations: self.registrations.load(Ordering::Relaxed),
            duplicate_registrations: self.duplicate_registrations.load(Ordering::Relaxed),
            rejected_registrations: self.rejected_registrations.load(Ordering::Relaxed),
            resolutions: self.resolutions.load(Ordering::Relaxed),
            failed_resolutions: self.failed_resolutions.load(Ordering::Relaxed),
            cas_conflicts: self.cas_conflicts.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
