//! Error taxonomy for the daemon.
//!
//! Five kinds, matching the propagation policy: `ConfigError` and
//! `BindError` are fatal at startup; `PacketError` and `TransportError`
//! are recovered locally without disturbing the routing table;
//! `InternalError` is fail-fast.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("missing directive `{0}`")]
    MissingDirective(&'static str),
    #[error("duplicate directive `{0}`")]
    DuplicateDirective(&'static str),
    #[error("unknown directive `{0}`")]
    UnknownDirective(String),
    #[error("router-id must be an integer in [1, 64000], got `{0}`")]
    InvalidRouterId(String),
    #[error("input-ports must not be empty")]
    EmptyInputPorts,
    #[error("input port must be an integer in [1024, 64000], got `{0}`")]
    InvalidInputPort(String),
    #[error("duplicate input port {0}")]
    DuplicateInputPort(u16),
    #[error("outputs must not be empty")]
    EmptyOutputs,
    #[error("malformed output tuple `{0}`, expected port-metric-neighbour_id")]
    MalformedOutput(String),
    #[error("output port must be an integer in [1024, 64000], got `{0}`")]
    InvalidOutputPort(String),
    #[error("output port {0} collides with an input port")]
    OutputInputOverlap(u16),
    #[error("direct metric must be an integer in [1, 15], got `{0}`")]
    InvalidMetric(String),
    #[error("neighbour id must be an integer in [1, 64000], got `{0}`")]
    InvalidNeighborId(String),
    #[error("malformed timers tuple `{0}`, expected period, timeout, garbage")]
    MalformedTimers(String),
    #[error("timer value must be a positive integer, got `{0}`")]
    InvalidTimerValue(String),
    #[error(
        "timers must satisfy timeout = 6*period and garbage = 4*period \
         (got period={period}, timeout={timeout}, garbage={garbage})"
    )]
    TimerRatioViolation {
        period: u64,
        timeout: u64,
        garbage: u64,
    },
}

#[derive(Debug, Error)]
#[error("failed to bind input port {port}: {source}")]
pub struct BindError {
    pub port: u16,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum PacketError {
    #[error("packet length is not 4 + 20*k bytes")]
    InvalidLength,
    #[error("unsupported command, only response (2) is processed")]
    UnsupportedCommand,
    #[error("unsupported version, only version 2 is processed")]
    UnsupportedVersion,
    #[error("sender router-id out of range [1, 64000]")]
    SenderOutOfRange,
    #[error("sender is not a configured neighbour")]
    UnknownSender,
    #[error("route entry has an unsupported address family")]
    BadAddressFamily,
    #[error("route entry has a non-zero reserved field")]
    NonZeroReserved,
    #[error("route entry destination out of range [1, 64000]")]
    DestinationOutOfRange,
    #[error("route entry metric out of range [0, 16]")]
    MetricOutOfRange,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("receive failed on input socket: {0}")]
    Receive(#[source] io::Error),
    #[error("send failed to neighbour: {0}")]
    Send(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum InternalError {
    #[error("timer fired for destination {destination} with no matching route entry")]
    OrphanTimer { destination: u16 },
    #[error("routing table invariant violated: {0}")]
    InvariantViolation(&'static str),
}
