//! RIPv2 wire codec (C1).
//!
//! Wire format, network byte order:
//!   header (4 bytes):      command(u8) | version(u8) | sender_router_id(u16)
//!   route entry (20 bytes): afi(u16) | must_be_zero(u16) | destination(u32)
//!                           | zero(u32) | zero(u32) | metric(u32)
//!
//! `decode` only checks that the buffer length is `4 + 20*k`; every other
//! field check lives in [`validate`] so callers can tell a malformed
//! packet apart from one that is merely wire-valid but unusable.

use crate::config::NeighborConfig;
use crate::error::PacketError;
use crate::route::RoutingTable;

pub const HEADER_LEN: usize = 4;
pub const ENTRY_LEN: usize = 20;

pub const COMMAND_REQUEST: u8 = 1;
pub const COMMAND_RESPONSE: u8 = 2;
pub const VERSION: u8 = 2;
pub const AFI_INET: u16 = 2;
pub const INFINITY: u8 = 16;

/// A single decoded route entry, still carrying the raw wire fields so
/// [`validate`] can reject non-zero reserved fields.
#[derive(Debug, Clone, Copy)]
pub struct RawEntry {
    pub afi: u16,
    pub must_be_zero: u16,
    pub destination: u32,
    pub zero1: u32,
    pub zero2: u32,
    pub metric: u32,
}

#[derive(Debug, Clone)]
pub struct Packet {
    pub command: u8,
    pub version: u8,
    pub sender_router_id: u16,
    pub entries: Vec<RawEntry>,
}

/// A packet that has passed [`validate`]: a sender router-id and a list
/// of `(destination, metric)` pairs ready for the route processor.
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub sender: u16,
    pub entries: Vec<(u16, u8)>,
}

impl Packet {
    /// Decode a datagram. Fails only on length; field validity is
    /// checked separately by [`validate`].
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN || (buf.len() - HEADER_LEN) % ENTRY_LEN != 0 {
            return Err(PacketError::InvalidLength);
        }

        let command = buf[0];
        let version = buf[1];
        let sender_router_id = u16::from_be_bytes([buf[2], buf[3]]);

        let mut entries = Vec::with_capacity((buf.len() - HEADER_LEN) / ENTRY_LEN);
        let mut offset = HEADER_LEN;
        while offset < buf.len() {
            let chunk = &buf[offset..offset + ENTRY_LEN];
            entries.push(RawEntry {
                afi: u16::from_be_bytes([chunk[0], chunk[1]]),
                must_be_zero: u16::from_be_bytes([chunk[2], chunk[3]]),
                destination: u32::from_be_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]),
                zero1: u32::from_be_bytes([chunk[8], chunk[9], chunk[10], chunk[11]]),
                zero2: u32::from_be_bytes([chunk[12], chunk[13], chunk[14], chunk[15]]),
                metric: u32::from_be_bytes([chunk[16], chunk[17], chunk[18], chunk[19]]),
            });
            offset += ENTRY_LEN;
        }

        Ok(Self {
            command,
            version,
            sender_router_id,
            entries,
        })
    }

    /// Validate a decoded packet against protocol and neighbour
    /// constraints, producing a ready-to-process [`Advertisement`].
    pub fn validate(&self, neighbors: &[NeighborConfig]) -> Result<Advertisement, PacketError> {
        if self.command != COMMAND_RESPONSE {
            return Err(PacketError::UnsupportedCommand);
        }
        if self.version != VERSION {
            return Err(PacketError::UnsupportedVersion);
        }
        if !(1..=64000).contains(&self.sender_router_id) {
            return Err(PacketError::SenderOutOfRange);
        }
        if !neighbors
            .iter()
            .any(|n| n.neighbor_id == self.sender_router_id)
        {
            return Err(PacketError::UnknownSender);
        }

        let mut entries = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if entry.afi != AFI_INET {
                return Err(PacketError::BadAddressFamily);
            }
            if entry.must_be_zero != 0 || entry.zero1 != 0 || entry.zero2 != 0 {
                return Err(PacketError::NonZeroReserved);
            }
            if !(1..=64000).contains(&entry.destination) {
                return Err(PacketError::DestinationOutOfRange);
            }
            if entry.metric > u32::from(INFINITY) {
                return Err(PacketError::MetricOutOfRange);
            }
            entries.push((entry.destination as u16, entry.metric as u8));
        }

        Ok(Advertisement {
            sender: self.sender_router_id,
            entries,
        })
    }
}

/// Build a RIPv2 response advertising `table` to `neighbor_id`, applying
/// split horizon with poisoned reverse.
pub fn encode_response(sender_router_id: u16, table: &RoutingTable, neighbor_id: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + table.len() * ENTRY_LEN);
    buf.push(COMMAND_RESPONSE);
    buf.push(VERSION);
    buf.extend_from_slice(&sender_router_id.to_be_bytes());

    for entry in table.snapshot() {
        let metric = if entry.next_hop == neighbor_id {
            INFINITY
        } else {
            entry.metric
        };
        buf.extend_from_slice(&AFI_INET.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&u32::from(entry.destination).to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&u32::from(metric).to_be_bytes());
    }

    buf
}
