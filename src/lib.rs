//! ripd: a RIPv2-style distance-vector routing daemon running entirely
//! over loopback UDP.
//!
//! The crate is organized by the wire/data boundary each module owns:
//! [`packet`] is the codec, [`route`] and [`timer`] hold the state a
//! running instance mutates, [`processor`] is the pure update logic
//! applied to that state, and [`instance`] wires sockets, timers and
//! the processor together into the running event loop.

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod instance;
pub mod metrics;
pub mod packet;
pub mod processor;
pub mod route;
pub mod socket;
pub mod timer;
