//! Runtime counters for the memory store.
//!
//! Lock-free `AtomicU64` counters incremented on the hot path and read on
//! dashboard export. The store owns one [`StoreCounters`]; hosts read it
//! through [`crate::MemoryStore::counters`].

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for store activity since startup.
#[derive(Debug)]
pub struct StoreCounters {
    /// Interactions recorded.
    pub interactions_recorded: AtomicU64,
    /// Memorable events created.
    pub memorable_events_created: AtomicU64,
    /// Gossip items added.
    pub gossip_added: AtomicU64,
    /// Successful `mark_as_referenced` calls.
    pub references_marked: AtomicU64,
    /// Snapshot saves that reached the slot.
    pub saves_completed: AtomicU64,
    /// Snapshot saves that failed.
    pub save_failures: AtomicU64,
    /// Listener callbacks that errored or panicked.
    pub listener_failures: AtomicU64,
}

impl StoreCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            interactions_recorded: AtomicU64::new(0),
            memorable_events_created: AtomicU64::new(0),
            gossip_added: AtomicU64::new(0),
            references_marked: AtomicU64::new(0),
            saves_completed: AtomicU64::new(0),
            save_failures: AtomicU64::new(0),
            listener_failures: AtomicU64::new(0),
        }
    }

    /// Bump a counter by one.
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Bump a counter by `n`.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            interactions_recorded: self.interactions_recorded.load(Ordering::Relaxed),
            memorable_events_created: self.memorable_events_created.load(Ordering::Relaxed),
            gossip_added: self.gossip_added.load(Ordering::Relaxed),
            references_marked: self.references_marked.load(Ordering::Relaxed),
            saves_completed: self.saves_completed.load(Ordering::Relaxed),
            save_failures: self.save_failures.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for StoreCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Interactions recorded.
    pub interactions_recorded: u64,
    /// Memorable events created.
    pub memorable_events_created: u64,
    /// Gossip items added.
    pub gossip_added: u64,
    /// Successful reference marks.
    pub references_marked: u64,
    /// Completed saves.
    pub saves_completed: u64,
    /// Failed saves.
    pub save_failures: u64,
    /// Failed listener callbacks.
    pub listener_failures: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows = [
            (
                "interactions_recorded",
                "Interactions recorded",
                self.interactions_recorded,
            ),
            (
                "memorable_events_created",
                "Memorable events created",
                self.memorable_events_created,
            ),
            ("gossip_added", "Gossip items added", self.gossip_added),
            (
                "references_marked",
                "Memorable events referenced in dialogue",
                self.references_marked,
            ),
            (
                "saves_completed",
                "Snapshot saves completed",
                self.saves_completed,
            ),
            ("save_failures", "Snapshot saves failed", self.save_failures),
            (
                "listener_failures",
                "Listener callbacks failed",
                self.listener_failures,
            ),
        ];
        let mut out = String::new();
        for (name, help, value) in rows {
            let _ = writeln!(out, "# HELP streetcred_{name}_total {help}");
            let _ = writeln!(out, "# TYPE streetcred_{name}_total counter");
            let _ = writeln!(out, "streetcred_{name}_total {value}");
        }
        out
    }
}
