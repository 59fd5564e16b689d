//! Route processor (C5): Bellman-Ford-style update application.
//!
//! Pure functions over [`RoutingTable`] + [`TimerService`] so the state
//! machine can be unit-tested without any socket or event-loop
//! machinery.

use std::time::{Duration, Instant};

use crate::config::{NeighborConfig, TimerConfig};
use crate::packet::INFINITY;
use crate::route::RoutingTable;
use crate::timer::{TimerKind, TimerService};

/// What happened as a result of applying an update, used by the caller
/// to decide whether to schedule a triggered advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Installed { metric: u8, next_hop: u16 },
    BecameUnreachable,
}

fn arm_timeout(
    table: &mut RoutingTable,
    timers: &mut TimerService,
    cfg: &TimerConfig,
    destination: u16,
    metric: u8,
    next_hop: u16,
    now: Instant,
) {
    let deadline = now + Duration::from_secs(cfg.timeout);
    table.upsert(destination, metric, next_hop, deadline);
    timers.schedule(destination, TimerKind::Timeout, deadline);
}

fn arm_garbage(
    table: &mut RoutingTable,
    timers: &mut TimerService,
    cfg: &TimerConfig,
    destination: u16,
    now: Instant,
) {
    let deadline = now + Duration::from_secs(cfg.garbage);
    table.mark_unreachable(destination, deadline);
    timers.schedule(destination, TimerKind::Garbage, deadline);
}

/// §4.5 step 1: direct-link refresh. Any packet received from a
/// configured neighbour proves the direct link is up, so its entry is
/// (re)installed at `min(direct metric, existing metric)` and its
/// timeout is re-armed.
pub fn refresh_direct_link(
    table: &mut RoutingTable,
    timers: &mut TimerService,
    cfg: &TimerConfig,
    neighbor: &NeighborConfig,
    now: Instant,
) {
    let metric = match table.get(neighbor.neighbor_id) {
        Some(existing) => existing.metric.min(neighbor.metric),
        None => neighbor.metric,
    };
    arm_timeout(
        table,
        timers,
        cfg,
        neighbor.neighbor_id,
        metric,
        neighbor.neighbor_id,
        now,
    );
}

/// §4.5 step 2: apply one advertised `(destination, adv_metric)` entry
/// received from `sender`, whose direct metric from us is
/// `direct_metric`.
#[allow(clippy::too_many_arguments)]
pub fn process_entry(
    table: &mut RoutingTable,
    timers: &mut TimerService,
    cfg: &TimerConfig,
    local_router_id: u16,
    sender: u16,
    direct_metric: u8,
    destination: u16,
    adv_metric: u8,
    now: Instant,
) -> Transition {
    if destination == local_router_id {
        return Transition::None;
    }

    let new_metric = u16::from(adv_metric)
        .saturating_add(u16::from(direct_metric))
        .min(u16::from(INFINITY)) as u8;

    match table.get(destination) {
        None => {
            if new_metric < INFINITY {
                arm_timeout(table, timers, cfg, destination, new_metric, sender, now);
                Transition::Installed {
                    metric: new_metric,
                    next_hop: sender,
                }
            } else {
                Transition::None
            }
        }
        Some(cur) if cur.next_hop == sender => {
            if new_metric != cur.metric {
                if new_metric == INFINITY {
                    arm_garbage(table, timers, cfg, destination, now);
                    Transition::BecameUnreachable
                } else {
                    arm_timeout(table, timers, cfg, destination, new_metric, sender, now);
                    Transition::Installed {
                        metric: new_metric,
                        next_hop: sender,
                    }
                }
            } else {
                if new_metric < INFINITY {
                    arm_timeout(table, timers, cfg, destination, new_metric, sender, now);
                }
                Transition::None
            }
        }
        Some(cur) if cur.next_hop != sender && new_metric < cur.metric => {
            arm_timeout(table, timers, cfg, destination, new_metric, sender, now);
            Transition::Installed {
                metric: new_metric,
                next_hop: sender,
            }
        }
        Some(_) => Transition::None,
    }
}

/// §4.4 timeout timer fire action: the destination stopped being
/// refreshed in time, so it becomes unreachable and garbage collection
/// is armed. Returns `true` if this destination's deadline still
/// matched (the fire was not stale).
pub fn timeout_fire(
    table: &mut RoutingTable,
    timers: &mut TimerService,
    cfg: &TimerConfig,
    destination: u16,
    fired_deadline: Instant,
    now: Instant,
) -> bool {
    match table.get(destination) {
        Some(entry) if entry.timeout_deadline == fired_deadline && entry.metric < INFINITY => {
            arm_garbage(table, timers, cfg, destination, now);
            true
        }
        _ => false,
    }
}

/// §4.4 garbage timer fire action: remove the entry outright. Returns
/// `true` if this destination's deadline still matched.
pub fn garbage_fire(table: &mut RoutingTable, destination: u16, fired_deadline: Instant) -> bool {
    match table.get(destination) {
        Some(entry) if entry.garbage_deadline == Some(fired_deadline) => {
            table.remove(destination);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::INFINITY;

    fn cfg() -> TimerConfig {
        TimerConfig {
            period: 5,
            timeout: 30,
            garbage: 20,
        }
    }

    #[test]
    fn installs_a_new_reachable_destination() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        let mut timers = TimerService::new();
        let transition = process_entry(&mut table, &mut timers, &cfg(), 1, 2, 1, 3, 1, now);
        assert_eq!(
            transition,
            Transition::Installed {
                metric: 2,
                next_hop: 2
            }
        );
        let entry = table.get(3).unwrap();
        assert_eq!(entry.metric, 2);
        assert_eq!(entry.next_hop, 2);
    }

    #[test]
    fn ignores_new_unreachable_destination() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        let mut timers = TimerService::new();
        process_entry(&mut table, &mut timers, &cfg(), 1, 2, 1, 3, 15, now);
        assert!(table.get(3).is_none());
    }

    #[test]
    fn ignores_destination_equal_to_local_router() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        let mut timers = TimerService::new();
        process_entry(&mut table, &mut timers, &cfg(), 1, 2, 1, 1, 1, now);
        assert!(table.get(1).is_none());
    }

    #[test]
    fn better_metric_from_other_neighbor_replaces_route() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        let mut timers = TimerService::new();
        table.upsert(3, 10, 4, now);
        process_entry(&mut table, &mut timers, &cfg(), 1, 2, 1, 3, 1, now);
        let entry = table.get(3).unwrap();
        assert_eq!(entry.metric, 2);
        assert_eq!(entry.next_hop, 2);
    }

    #[test]
    fn worse_metric_from_other_neighbor_is_ignored() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        let mut timers = TimerService::new();
        table.upsert(3, 2, 4, now);
        process_entry(&mut table, &mut timers, &cfg(), 1, 2, 1, 3, 5, now);
        let entry = table.get(3).unwrap();
        assert_eq!(entry.metric, 2);
        assert_eq!(entry.next_hop, 4);
    }

    #[test]
    fn metric_16_from_current_next_hop_transitions_to_unreachable() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        let mut timers = TimerService::new();
        table.upsert(3, 2, 2, now);
        let transition =
            process_entry(&mut table, &mut timers, &cfg(), 1, 2, 1, 3, 15, now);
        assert_eq!(transition, Transition::BecameUnreachable);
        let entry = table.get(3).unwrap();
        assert_eq!(entry.metric, INFINITY);
        assert!(entry.garbage_deadline.is_some());
    }

    #[test]
    fn timeout_fire_marks_unreachable_and_arms_garbage() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        let mut timers = TimerService::new();
        let deadline = now + Duration::from_secs(30);
        table.upsert(3, 2, 2, deadline);
        assert!(timeout_fire(&mut table, &mut timers, &cfg(), 3, deadline, now));
        assert_eq!(table.get(3).unwrap().metric, INFINITY);
    }

    #[test]
    fn stale_timeout_fire_is_ignored() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        let mut timers = TimerService::new();
        let stale_deadline = now;
        table.upsert(3, 2, 2, now + Duration::from_secs(30));
        assert!(!timeout_fire(
            &mut table,
            &mut timers,
            &cfg(),
            3,
            stale_deadline,
            now
        ));
        assert_eq!(table.get(3).unwrap().metric, 2);
    }

    #[test]
    fn garbage_fire_removes_the_entry() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1);
        let deadline = now + Duration::from_secs(20);
        table.upsert(3, 2, 2, now);
        table.mark_unreachable(3, deadline);
        assert!(garbage_fire(&mut table, 3, deadline));
        assert!(table.get(3).is_none());
    }
}
