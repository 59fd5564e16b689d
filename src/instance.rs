//! Event loop (C6): the running router instance.
//!
//! One `std::sync::Mutex` guards the routing table, timer service and
//! triggered-update state together; reader tasks and `run` itself take
//! the lock only for synchronous work, never while awaiting socket I/O.
//! This lets a caller inspect a live instance's routing table without
//! tearing the event loop down, which the integration tests rely on.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep_until;

use crate::config::{NeighborConfig, RouterConfig, TimerConfig};
use crate::error::{BindError, InternalError, TransportError};
use crate::events::Event;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::packet::{self, Packet};
use crate::processor::{self, Transition};
use crate::route::{RouteEntry, RoutingTable};
use crate::socket::SocketSet;
use crate::timer::{TimerKind, TimerService};

/// Everything mutated by datagram handling and timer fires, behind one
/// mutex so the "no blocking I/O while holding the mutex" rule has
/// exactly one lock to honor.
struct State {
    table: RoutingTable,
    timers: TimerService,
    pending_trigger: bool,
    trigger_deadline: Option<Instant>,
    last_send: Instant,
}

fn schedule_trigger(state: &mut State) {
    if state.pending_trigger {
        return;
    }
    state.pending_trigger = true;
    let wait_secs = rand::thread_rng().gen_range(1.0..=5.0_f64);
    let earliest = state.last_send + Duration::from_secs_f64(wait_secs);
    state.trigger_deadline = Some(earliest.max(Instant::now()));
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(365 * 24 * 3600)
}

fn to_tokio(instant: Instant) -> tokio::time::Instant {
    tokio::time::Instant::from_std(instant)
}

pub struct Instance {
    router_id: u16,
    outputs: Vec<NeighborConfig>,
    timer_cfg: TimerConfig,
    state: Arc<Mutex<State>>,
    sockets: Arc<SocketSet>,
    metrics: Metrics,
    reader_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Instance {
    pub async fn new(config: RouterConfig) -> Result<Self, BindError> {
        let sockets = SocketSet::bind(&config.input_ports).await?;
        Ok(Self {
            router_id: config.router_id,
            outputs: config.outputs,
            timer_cfg: config.timers,
            state: Arc::new(Mutex::new(State {
                table: RoutingTable::new(config.router_id),
                timers: TimerService::new(),
                pending_trigger: false,
                trigger_deadline: None,
                last_send: Instant::now(),
            })),
            sockets: Arc::new(sockets),
            metrics: Metrics::new(),
            reader_handles: Mutex::new(Vec::new()),
        })
    }

    pub fn route(&self, destination: u16) -> Option<RouteEntry> {
        self.state
            .lock()
            .expect("lock poisoned")
            .table
            .get(destination)
            .copied()
    }

    pub fn route_count(&self) -> usize {
        self.state.lock().expect("lock poisoned").table.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.route_count())
    }

    /// Run the event loop. Spawns one reader task per input socket,
    /// sends a bootstrap advertisement, then drives periodic, triggered
    /// and per-route timer deadlines via `select!` until every reader
    /// task has exited (which only happens if every socket dies, since
    /// readers run forever otherwise) or an invariant is violated.
    pub async fn run(&self) -> Result<(), InternalError> {
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(256);
        let mut handles = Vec::with_capacity(self.sockets.input_sockets().len());
        for socket in self.sockets.input_sockets().iter().cloned() {
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                let mut buf = vec![0u8; 1024];
                loop {
                    match socket.recv_from(&mut buf).await {
                        Ok((n, _from)) => {
                            if tx.send(buf[..n].to_vec()).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            let err = TransportError::Receive(err);
                            Event::TransportError(&err.to_string()).log();
                        }
                    }
                }
            }));
        }
        *self.reader_handles.lock().expect("lock poisoned") = handles;
        drop(tx);

        Event::Bootstrap.log();
        self.send_to_all().await;
        {
            let mut state = self.state.lock().expect("lock poisoned");
            state.last_send = Instant::now();
            state.table.clear_changed_flags();
        }
        let mut periodic_deadline = self.next_periodic_deadline();

        loop {
            let timer_deadline = self.state.lock().expect("lock poisoned").timers.next_deadline();
            let trigger_deadline = self.state.lock().expect("lock poisoned").trigger_deadline;

            let timer_sleep = sleep_until(to_tokio(timer_deadline.unwrap_or_else(far_future)));
            let periodic_sleep = sleep_until(to_tokio(periodic_deadline));
            let trigger_sleep = sleep_until(to_tokio(trigger_deadline.unwrap_or_else(far_future)));

            tokio::select! {
                datagram = rx.recv() => {
                    match datagram {
                        Some(bytes) => self.handle_datagram(&bytes)?,
                        None => break,
                    }
                }
                _ = periodic_sleep => {
                    Event::PeriodicUpdate.log();
                    self.send_to_all().await;
                    let mut state = self.state.lock().expect("lock poisoned");
                    state.last_send = Instant::now();
                    state.table.clear_changed_flags();
                    periodic_deadline = self.next_periodic_deadline();
                }
                _ = timer_sleep, if timer_deadline.is_some() => {
                    self.fire_timers()?;
                }
                _ = trigger_sleep, if trigger_deadline.is_some() => {
                    Event::TriggeredUpdate.log();
                    self.send_to_all().await;
                    let mut state = self.state.lock().expect("lock poisoned");
                    state.last_send = Instant::now();
                    state.pending_trigger = false;
                    state.trigger_deadline = None;
                }
            }
        }
        Ok(())
    }

    fn next_periodic_deadline(&self) -> Instant {
        let jitter = rand::thread_rng().gen_range(0.8..=1.2_f64);
        let secs = self.timer_cfg.period as f64 * jitter;
        Instant::now() + Duration::from_secs_f64(secs)
    }

    fn handle_datagram(&self, bytes: &[u8]) -> Result<(), InternalError> {
        self.metrics.increment_packets_received();
        let packet = match Packet::decode(bytes) {
            Ok(packet) => packet,
            Err(err) => {
                Event::PacketDrop(&err).log();
                self.metrics.increment_packets_dropped();
                return Ok(());
            }
        };
        let advertisement = match packet.validate(&self.outputs) {
            Ok(advertisement) => advertisement,
            Err(err) => {
                Event::PacketDrop(&err).log();
                self.metrics.increment_packets_dropped();
                return Ok(());
            }
        };
        Event::PacketRx(&advertisement).log();

        let Some(neighbor) = self
            .outputs
            .iter()
            .find(|n| n.neighbor_id == advertisement.sender)
            .copied()
        else {
            return Ok(());
        };

        let now = Instant::now();
        let mut state = self.state.lock().expect("lock poisoned");
        processor::refresh_direct_link(
            &mut state.table,
            &mut state.timers,
            &self.timer_cfg,
            &neighbor,
            now,
        );

        let mut triggered = false;
        for (destination, adv_metric) in &advertisement.entries {
            let transition = processor::process_entry(
                &mut state.table,
                &mut state.timers,
                &self.timer_cfg,
                self.router_id,
                neighbor.neighbor_id,
                neighbor.metric,
                *destination,
                *adv_metric,
                now,
            );
            match transition {
                Transition::Installed { metric, next_hop } => {
                    Event::RouteInstall {
                        destination: *destination,
                        metric,
                        next_hop,
                    }
                    .log();
                }
                Transition::BecameUnreachable => {
                    Event::RouteTimeout {
                        destination: *destination,
                    }
                    .log();
                    triggered = true;
                }
                Transition::None => {}
            }
        }
        if triggered {
            schedule_trigger(&mut state);
        }

        state.table.check_invariants(&self.neighbor_ids())
    }

    fn fire_timers(&self) -> Result<(), InternalError> {
        let now = Instant::now();
        let mut state = self.state.lock().expect("lock poisoned");
        let ready = state.timers.pop_ready(now);

        let mut triggered = false;
        for (destination, kind, deadline) in ready {
            match kind {
                TimerKind::Timeout => {
                    if processor::timeout_fire(
                        &mut state.table,
                        &mut state.timers,
                        &self.timer_cfg,
                        destination,
                        deadline,
                        now,
                    ) {
                        Event::RouteTimeout { destination }.log();
                        triggered = true;
                    }
                }
                TimerKind::Garbage => {
                    if processor::garbage_fire(&mut state.table, destination, deadline) {
                        Event::RouteGarbageCollect { destination }.log();
                    }
                }
            }
        }
        if triggered {
            schedule_trigger(&mut state);
        }

        state.table.check_invariants(&self.neighbor_ids())
    }

    fn neighbor_ids(&self) -> Vec<u16> {
        self.outputs.iter().map(|n| n.neighbor_id).collect()
    }

    /// Build and send one advertisement per neighbour, with split
    /// horizon and poisoned reverse applied per-neighbour by
    /// [`packet::encode_response`]. The table is only read (and the
    /// mutex only held) long enough to build the payloads; the actual
    /// sends happen outside the lock.
    async fn send_to_all(&self) {
        let payloads: Vec<(SocketAddr, Vec<u8>)> = {
            let state = self.state.lock().expect("lock poisoned");
            self.outputs
                .iter()
                .map(|neighbor| {
                    let payload =
                        packet::encode_response(self.router_id, &state.table, neighbor.neighbor_id);
                    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, neighbor.output_port));
                    (addr, payload)
                })
                .collect()
        };

        for (addr, payload) in payloads {
            match self.sockets.send_socket().send_to(&payload, addr).await {
                Ok(_) => self.metrics.increment_packets_sent(),
                Err(err) => {
                    let err = TransportError::Send(err);
                    Event::TransportError(&err.to_string()).log();
                }
            }
        }
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        if let Ok(handles) = self.reader_handles.lock() {
            for handle in handles.iter() {
                handle.abort();
            }
        }
    }
}
