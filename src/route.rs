//! Routing table (C3).
//!
//! Keyed by destination router-id in a `BTreeMap` so iteration order is
//! deterministic — required for R2/R3 (two advertisements built from an
//! unchanged table must be byte-identical).

use std::collections::BTreeMap;
use std::time::Instant;

use crate::error::InternalError;
use crate::packet::INFINITY;

/// A single routing-table entry. `timeout_deadline` is always present
/// (it records when the route would next time out if still reachable);
/// `garbage_deadline` is `Some` only while `metric == 16`.
#[derive(Debug, Clone, Copy)]
pub struct RouteEntry {
    pub destination: u16,
    pub metric: u8,
    pub next_hop: u16,
    pub timeout_deadline: Instant,
    pub garbage_deadline: Option<Instant>,
    pub flag_changed: bool,
}

#[derive(Debug)]
pub struct RoutingTable {
    router_id: u16,
    routes: BTreeMap<u16, RouteEntry>,
}

impl RoutingTable {
    pub fn new(router_id: u16) -> Self {
        Self {
            router_id,
            routes: BTreeMap::new(),
        }
    }

    pub fn get(&self, destination: u16) -> Option<&RouteEntry> {
        self.routes.get(&destination)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn snapshot(&self) -> impl Iterator<Item = &RouteEntry> {
        self.routes.values()
    }

    /// Install or overwrite the entry for `destination`. Clears
    /// `garbage_deadline` when `metric < 16` (invariant I2); the caller
    /// (the route processor) is responsible for scheduling the timeout
    /// timer that matches `timeout_deadline` with the timer service.
    pub fn upsert(
        &mut self,
        destination: u16,
        metric: u8,
        next_hop: u16,
        timeout_deadline: Instant,
    ) -> &RouteEntry {
        debug_assert_ne!(destination, self.router_id, "I3: no entry for local router");
        debug_assert!((1..=INFINITY).contains(&metric), "I1: metric in [1,16]");

        let entry = self.routes.entry(destination).or_insert(RouteEntry {
            destination,
            metric,
            next_hop,
            timeout_deadline,
            garbage_deadline: None,
            flag_changed: true,
        });
        entry.metric = metric;
        entry.next_hop = next_hop;
        entry.timeout_deadline = timeout_deadline;
        entry.flag_changed = true;
        if metric < INFINITY {
            entry.garbage_deadline = None;
        }
        entry
    }

    /// Mark `destination` unreachable (metric 16) and arm its garbage
    /// deadline (invariant I2). No-op if the destination is absent.
    pub fn mark_unreachable(&mut self, destination: u16, garbage_deadline: Instant) {
        if let Some(entry) = self.routes.get_mut(&destination) {
            entry.metric = INFINITY;
            entry.garbage_deadline = Some(garbage_deadline);
            entry.flag_changed = true;
        }
    }

    /// Unconditional removal — only the garbage-collection timer should
    /// call this.
    pub fn remove(&mut self, destination: u16) -> Option<RouteEntry> {
        self.routes.remove(&destination)
    }

    pub fn clear_changed_flags(&mut self) {
        for entry in self.routes.values_mut() {
            entry.flag_changed = false;
        }
    }

    /// Sweep I1-I4 after a batch of mutations. The event loop calls this
    /// and treats a violation as fatal (InternalError) rather than
    /// letting corrupted state keep running. `neighbor_ids` is the
    /// configured neighbour set, needed for I4.
    pub fn check_invariants(&self, neighbor_ids: &[u16]) -> Result<(), InternalError> {
        for (&destination, entry) in &self.routes {
            if destination == self.router_id {
                return Err(InternalError::InvariantViolation(
                    "route entry exists for local router id",
                ));
            }
            if entry.metric == 0 || entry.metric > INFINITY {
                return Err(InternalError::InvariantViolation("metric out of range"));
            }
            if (entry.metric == INFINITY) != entry.garbage_deadline.is_some() {
                return Err(InternalError::InvariantViolation(
                    "metric-16/garbage-deadline mismatch",
                ));
            }
            if !neighbor_ids.contains(&entry.next_hop) {
                return Err(InternalError::InvariantViolation(
                    "next_hop is not a configured neighbour",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_installs_a_fresh_route() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        table.upsert(2, 3, 2, now);
        let entry = table.get(2).unwrap();
        assert_eq!(entry.metric, 3);
        assert_eq!(entry.next_hop, 2);
        assert!(entry.garbage_deadline.is_none());
    }

    #[test]
    fn upsert_clears_garbage_deadline_on_recovery() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        table.upsert(2, 1, 2, now);
        table.mark_unreachable(2, now);
        assert!(table.get(2).unwrap().garbage_deadline.is_some());

        table.upsert(2, 1, 2, now);
        assert!(table.get(2).unwrap().garbage_deadline.is_none());
        assert_eq!(table.get(2).unwrap().metric, 1);
    }

    #[test]
    fn mark_unreachable_sets_infinity_and_garbage_deadline() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        table.upsert(2, 1, 2, now);
        table.mark_unreachable(2, now);
        let entry = table.get(2).unwrap();
        assert_eq!(entry.metric, INFINITY);
        assert!(entry.garbage_deadline.is_some());
    }

    #[test]
    fn remove_deletes_the_entry() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        table.upsert(2, 1, 2, now);
        assert!(table.remove(2).is_some());
        assert!(table.get(2).is_none());
    }

    #[test]
    fn snapshot_iterates_in_destination_order() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        table.upsert(5, 1, 5, now);
        table.upsert(2, 1, 2, now);
        table.upsert(9, 1, 9, now);
        let destinations: Vec<u16> = table.snapshot().map(|e| e.destination).collect();
        assert_eq!(destinations, vec![2, 5, 9]);
    }
}
