//! Timer service (C4).
//!
//! Per-destination timeout/garbage timers are kept in a min-heap ordered
//! by deadline. Cancellation is lazy: a popped heap entry is only acted
//! on if its deadline still matches the deadline currently recorded on
//! the route entry for that destination/kind — a route that was
//! re-armed or removed since the entry was scheduled is simply skipped.
//! This gives the race-safety the spec asks for without a generation
//! counter or explicit cancel token.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimerKind {
    Timeout,
    Garbage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct HeapEntry {
    deadline: Instant,
    destination: u16,
    kind: TimerKind,
}

#[derive(Debug, Default)]
pub struct TimerService {
    heap: BinaryHeap<Reverse<HeapEntry>>,
}

impl TimerService {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    /// Arm a timer. Arming a new one for the same (destination, kind)
    /// does not need to remove the old heap entry — it will be found
    /// stale and dropped when it eventually fires, since the route
    /// entry's own deadline field will already have moved on.
    pub fn schedule(&mut self, destination: u16, kind: TimerKind, deadline: Instant) {
        self.heap.push(Reverse(HeapEntry {
            deadline,
            destination,
            kind,
        }));
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(e)| e.deadline)
    }

    /// Pop every heap entry whose deadline has passed. Staleness against
    /// the routing table is the caller's responsibility (it needs the
    /// table to check).
    pub fn pop_ready(&mut self, now: Instant) -> Vec<(u16, TimerKind, Instant)> {
        let mut ready = Vec::new();
        while let Some(Reverse(entry)) = self.heap.peek() {
            if entry.deadline > now {
                break;
            }
            let Reverse(entry) = self.heap.pop().unwrap();
            ready.push((entry.destination, entry.kind, entry.deadline));
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pops_only_entries_at_or_before_now() {
        let mut timers = TimerService::new();
        let base = Instant::now();
        timers.schedule(1, TimerKind::Timeout, base);
        timers.schedule(2, TimerKind::Timeout, base + Duration::from_secs(10));

        let ready = timers.pop_ready(base);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].0, 1);
        assert!(timers.next_deadline().is_some());
    }

    #[test]
    fn orders_by_earliest_deadline() {
        let mut timers = TimerService::new();
        let base = Instant::now();
        timers.schedule(1, TimerKind::Timeout, base + Duration::from_secs(5));
        timers.schedule(2, TimerKind::Garbage, base + Duration::from_secs(1));
        assert_eq!(
            timers.next_deadline().unwrap(),
            base + Duration::from_secs(1)
        );
    }
}
