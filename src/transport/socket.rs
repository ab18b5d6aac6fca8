//! Socket abstraction under the transport connection

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;

use crate::config::TransportConfig;

/// Live status of an underlying socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketStatus {
    Connected,
    Closed,
    Broken,
}

/// Send-side gauges reported by the underlying transport.
///
/// A plain datagram socket cannot measure most of these and reports
/// zeros; a reliable-transport binding fills them in.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkStats {
    pub rtt_ms: f64,
    pub packet_loss_pct: f64,
    pub bandwidth_estimate_bps: f64,
    pub congestion_window: u64,
    pub packets_in_flight: u64,
    pub retransmitted_packets: u64,
    pub retransmitted_bytes: u64,
    pub send_drops: u64,
}

/// One outbound socket-like connection to a receiver.
///
/// This is the seam under `TransportConnection`: chunks arriving here are
/// already bounded by the segment ceiling and must be written whole. A
/// short write is reported back as the written byte count, never retried
/// at this layer.
pub trait TransportSocket: Send {
    /// Send one chunk, returning the number of bytes actually written.
    fn send_chunk(&self, chunk: &[u8]) -> io::Result<usize>;

    /// Query the live socket status.
    fn status(&self) -> SocketStatus;

    /// Snapshot the transport-level gauges.
    fn link_stats(&self) -> LinkStats;

    /// Release the socket. Must be safe to call more than once.
    fn close(&mut self);
}

/// Connected UDP datagram socket.
///
/// Matches the plain-UDP receivers the system is tested against. The
/// stream-control options in `TransportConfig` (latency budget,
/// passphrase, stream id, bandwidth ceiling) have no datagram-level
/// equivalent and are logged as advisory; buffer sizes are applied.
pub struct UdpTransportSocket {
    socket: Option<std::net::UdpSocket>,
}

impl UdpTransportSocket {
    pub fn connect(addr: SocketAddr, config: &TransportConfig) -> io::Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;

        if let Some(size) = config.send_buffer_size {
            socket.set_send_buffer_size(size)?;
        }
        if let Some(size) = config.recv_buffer_size {
            socket.set_recv_buffer_size(size)?;
        }

        socket.connect_timeout(&addr.into(), config.connect_timeout())?;

        if config.passphrase.is_some() || config.stream_id.is_some() {
            log::debug!(
                "datagram transport: passphrase/stream id options are advisory and not applied"
            );
        }
        log::debug!(
            "datagram transport: latency budget {} ms is a receiver-side concern",
            config.latency_ms
        );

        Ok(Self {
            socket: Some(socket.into()),
        })
    }
}

impl TransportSocket for UdpTransportSocket {
    fn send_chunk(&self, chunk: &[u8]) -> io::Result<usize> {
        match &self.socket {
            Some(socket) => socket.send(chunk),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "socket closed")),
        }
    }

    fn status(&self) -> SocketStatus {
        match &self.socket {
            // A connected datagram socket stays usable until closed; peer
            // loss surfaces as an error on send (ICMP unreachable).
            Some(socket) => match socket.peer_addr() {
                Ok(_) => SocketStatus::Connected,
                Err(_) => SocketStatus::Broken,
            },
            None => SocketStatus::Closed,
        }
    }

    fn link_stats(&self) -> LinkStats {
        LinkStats::default()
    }

    fn close(&mut self) {
        self.socket = None;
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted socket for transport and pacer tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    pub struct MockBehavior {
        /// Chunk index at which to simulate a short write
        pub short_write_at: Option<usize>,
        /// Error kind returned on every send once set
        pub fail_with: Option<io::ErrorKind>,
        /// Status reported to health checks
        pub broken: bool,
        /// Gauges reported by `link_stats`
        pub stats: LinkStats,
    }

    /// Records every chunk the connection writes.
    #[derive(Clone, Default)]
    pub struct MockSocket {
        pub sent: Arc<Mutex<Vec<Vec<u8>>>>,
        pub behavior: Arc<Mutex<MockBehavior>>,
        counter: Arc<AtomicUsize>,
    }

    impl MockSocket {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent_chunks(&self) -> Vec<Vec<u8>> {
            self.sent.lock().unwrap().clone()
        }

        pub fn set_fail(&self, kind: io::ErrorKind) {
            self.behavior.lock().unwrap().fail_with = Some(kind);
        }
    }

    impl TransportSocket for MockSocket {
        fn send_chunk(&self, chunk: &[u8]) -> io::Result<usize> {
            let behavior = self.behavior.lock().unwrap();
            if let Some(kind) = behavior.fail_with {
                return Err(io::Error::new(kind, "scripted failure"));
            }

            let index = self.counter.fetch_add(1, Ordering::SeqCst);
            if behavior.short_write_at == Some(index) {
                let written = chunk.len() / 2;
                self.sent.lock().unwrap().push(chunk[..written].to_vec());
                return Ok(written);
            }

            self.sent.lock().unwrap().push(chunk.to_vec());
            Ok(chunk.len())
        }

        fn status(&self) -> SocketStatus {
            if self.behavior.lock().unwrap().broken {
                SocketStatus::Broken
            } else {
                SocketStatus::Connected
            }
        }

        fn link_stats(&self) -> LinkStats {
            self.behavior.lock().unwrap().stats
        }

        fn close(&mut self) {}
    }
}
