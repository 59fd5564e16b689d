//! Socket set (C2): one datagram socket per configured input port, bound
//! to loopback. The first input socket doubles as the send socket, so a
//! peer sees this router's first input port as its source port.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;

use crate::error::BindError;

pub struct SocketSet {
    sockets: Vec<Arc<UdpSocket>>,
}

impl SocketSet {
    pub async fn bind(ports: &[u16]) -> Result<Self, BindError> {
        let mut sockets = Vec::with_capacity(ports.len());
        for &port in ports {
            let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
            let socket = UdpSocket::bind(addr)
                .await
                .map_err(|source| BindError { port, source })?;
            sockets.push(Arc::new(socket));
        }
        Ok(Self { sockets })
    }

    /// The socket every outbound packet is sent through.
    pub fn send_socket(&self) -> &Arc<UdpSocket> {
        &self.sockets[0]
    }

    pub fn input_sockets(&self) -> &[Arc<UdpSocket>] {
        &self.sockets
    }
}
