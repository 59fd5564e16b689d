//! Structured event log records (A3).
//!
//! One enum variant per notable occurrence, logged through a single
//! `log()` method — the organization is borrowed from how routing
//! daemons in this space centralize their debug logging (see
//! `holo-rip`'s `debug.rs`), adapted to the `log`/`env_logger` stack
//! this crate actually depends on instead of `tracing`.

use log::{debug, info, warn};

use crate::error::PacketError;
use crate::packet::Advertisement;

#[derive(Debug)]
pub enum Event<'a> {
    Bootstrap,
    PeriodicUpdate,
    TriggeredUpdate,
    PacketRx(&'a Advertisement),
    PacketDrop(&'a PacketError),
    RouteInstall { destination: u16, metric: u8, next_hop: u16 },
    RouteTimeout { destination: u16 },
    RouteGarbageCollect { destination: u16 },
    TransportError(&'a str),
}

impl<'a> Event<'a> {
    pub fn log(&self) {
        match self {
            Event::Bootstrap => info!("sending bootstrap advertisement to all neighbours"),
            Event::PeriodicUpdate => debug!("sending periodic advertisement"),
            Event::TriggeredUpdate => debug!("sending triggered advertisement"),
            Event::PacketRx(advertisement) => debug!(
                "received advertisement from {} with {} entries",
                advertisement.sender,
                advertisement.entries.len()
            ),
            Event::PacketDrop(reason) => debug!("dropped packet: {reason}"),
            Event::RouteInstall {
                destination,
                metric,
                next_hop,
            } => debug!("route {destination} installed: metric={metric} next_hop={next_hop}"),
            Event::RouteTimeout { destination } => {
                debug!("route {destination} timed out, marked unreachable")
            }
            Event::RouteGarbageCollect { destination } => {
                debug!("route {destination} garbage-collected")
            }
            Event::TransportError(message) => warn!("transport error: {message}"),
        }
    }
}
