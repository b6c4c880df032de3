use std::collections::HashMap;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::net::UdpSocket;
use std::sync::Mutex;

use api_types::SinkRecord;

use super::gmetric;
use super::MetricSink;
use crate::error::SendError;

/// Sends gmetric datagrams over a single unconnected UDP socket.
///
/// Each `host:port` is resolved once and cached; failed lookups are not
/// cached and are retried on the next send. The socket never blocks, so a
/// full send buffer surfaces as a failed send.
pub struct UdpSink {
    socket: UdpSocket,
    targets: Mutex<HashMap<(String, u16), SocketAddr>>,
}

impl UdpSink {
    pub fn bind() -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            targets: Mutex::new(HashMap::new()),
        })
    }

    /// Bind and resolve the gmond address up front so the flush path only
    /// sees cached addresses. A failed lookup is logged and retried later.
    pub fn bind_for(host: Option<&str>, port: u16) -> std::io::Result<Self> {
        let sink = Self::bind()?;
        if let Some(host) = host.filter(|host| !host.is_empty()) {
            match sink.resolve_target(host, port) {
                Ok(addr) => tracing::info!("gmond {host}:{port} resolved to {addr}"),
                Err(e) => tracing::warn!(error = %e, "failed to resolve gmond, retrying on send"),
            }
        }
        Ok(sink)
    }

    /// Address for `host:port`, resolving it on first use.
    pub fn resolve_target(&self, host: &str, port: u16) -> Result<SocketAddr, SendError> {
        let key = (host.to_string(), port);
        if let Some(addr) = self.targets.lock().expect("poisoned").get(&key) {
            return Ok(*addr);
        }
        let addr = Self::resolve(host, port)?;
        self.targets.lock().expect("poisoned").insert(key, addr);
        Ok(addr)
    }

    fn resolve(host: &str, port: u16) -> Result<SocketAddr, SendError> {
        let addr = format!("{host}:{port}");
        let mut candidates = (host, port)
            .to_socket_addrs()
            .map_err(|source| SendError::Resolve {
                addr: addr.clone(),
                source,
            })?;
        candidates
            .find(SocketAddr::is_ipv4)
            .ok_or(SendError::NoAddress { addr })
    }
}

impl MetricSink for UdpSink {
    fn send(&self, host: &str, port: u16, record: &SinkRecord) -> Result<(), SendError> {
        let addr = self.resolve_target(host, port)?;
        let packets = gmetric::encode(record)?;
        for packet in [&packets.metadata, &packets.value] {
            self.socket
                .send_to(packet, addr)
                .map_err(|source| SendError::Io { addr, source })?;
        }
        Ok(())
    }
}
