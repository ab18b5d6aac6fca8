//! Transport connection: lifecycle, chunked send, statistics

use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Instant;

use crate::config::TransportConfig;
use crate::constants::MAX_SEGMENT_SIZE;
use crate::error::{ConnectionError, TransmissionError};
use crate::transport::socket::{SocketStatus, TransportSocket, UdpTransportSocket};
use crate::transport::stats::StreamingStats;
use crate::transport::url::TargetUrl;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Error => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Error,
            _ => ConnectionState::Disconnected,
        }
    }
}

#[derive(Default)]
struct SendCounters {
    packets_sent: AtomicU64,
    unique_packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl SendCounters {
    fn reset(&self) {
        self.packets_sent.store(0, Ordering::Relaxed);
        self.unique_packets_sent.store(0, Ordering::Relaxed);
        self.bytes_sent.store(0, Ordering::Relaxed);
    }
}

struct BitrateWindow {
    at: Instant,
    bytes: u64,
}

/// One outbound connection to a streaming receiver.
///
/// Owns at most one live socket at a time. Sends are issued serially from
/// the pacer task; `disconnect` may race a send from another thread, so
/// the socket slot is mutex-guarded and a send that observes an empty
/// slot reports a plain not-connected error.
pub struct TransportConnection {
    state: AtomicU8,
    socket: Mutex<Option<Box<dyn TransportSocket>>>,
    counters: SendCounters,
    bitrate: Mutex<Option<BitrateWindow>>,
}

impl TransportConnection {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected.as_u8()),
            socket: Mutex::new(None),
            counters: SendCounters::default(),
            bitrate: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Establish the connection described by `config`.
    ///
    /// Resolves the target (numeric literal first, hostname lookup as
    /// fallback), creates and configures the socket, and connects within
    /// the configured timeout. On any failure the socket is released and
    /// a typed error returned; there is no automatic retry.
    pub fn connect(&self, config: &TransportConfig) -> Result<(), ConnectionError> {
        if self.state() == ConnectionState::Connected {
            log::warn!("connect called on an already connected transport");
            return Ok(());
        }

        self.set_state(ConnectionState::Connecting);

        let result = (|| {
            config
                .validate()
                .map_err(ConnectionError::InvalidConfig)?;
            let url = TargetUrl::parse(&config.target)?;
            let addr = url.resolve()?;
            log::info!("connecting to {} ({})", url, addr);

            let socket = UdpTransportSocket::connect(addr, config).map_err(|err| {
                if err.kind() == std::io::ErrorKind::TimedOut {
                    ConnectionError::Timeout(config.connect_timeout_ms)
                } else {
                    ConnectionError::SocketCreation(err.to_string())
                }
            })?;
            Ok(Box::new(socket) as Box<dyn TransportSocket>)
        })();

        match result {
            Ok(socket) => {
                if let Ok(mut slot) = self.socket.lock() {
                    *slot = Some(socket);
                }
                self.counters.reset();
                if let Ok(mut window) = self.bitrate.lock() {
                    *window = Some(BitrateWindow {
                        at: Instant::now(),
                        bytes: 0,
                    });
                }
                self.set_state(ConnectionState::Connected);
                Ok(())
            }
            Err(err) => {
                // no lingering socket on a failed attempt
                if let Ok(mut slot) = self.socket.lock() {
                    if let Some(mut socket) = slot.take() {
                        socket.close();
                    }
                }
                self.set_state(ConnectionState::Error);
                log::error!("connect failed: {}", err);
                Err(err)
            }
        }
    }

    /// Send one payload, split into chunks no larger than the segment
    /// ceiling, each written sequentially.
    ///
    /// A short write aborts the payload immediately with a partial-send
    /// error; the protocol cannot safely resume a half-written chunk. A
    /// lost-connection condition flips the state to `Error` so later
    /// sends fail fast without touching the socket.
    pub fn send(&self, payload: &[u8]) -> Result<usize, TransmissionError> {
        match self.state() {
            ConnectionState::Connected => {}
            ConnectionState::Error => {
                return Err(TransmissionError::ConnectionLost(
                    "connection previously failed".into(),
                ));
            }
            _ => return Err(TransmissionError::NotConnected),
        }

        let slot = self
            .socket
            .lock()
            .map_err(|_| TransmissionError::NotConnected)?;
        // disconnect may have raced us; that is a normal not-connected
        let socket = slot.as_ref().ok_or(TransmissionError::NotConnected)?;

        for chunk in payload.chunks(MAX_SEGMENT_SIZE) {
            match socket.send_chunk(chunk) {
                Ok(written) if written == chunk.len() => {
                    self.counters.packets_sent.fetch_add(1, Ordering::Relaxed);
                    self.counters
                        .unique_packets_sent
                        .fetch_add(1, Ordering::Relaxed);
                    self.counters
                        .bytes_sent
                        .fetch_add(written as u64, Ordering::Relaxed);
                }
                Ok(written) => {
                    log::error!(
                        "partial send: wrote {} of {} bytes, aborting payload",
                        written,
                        chunk.len()
                    );
                    return Err(TransmissionError::PartialSend {
                        sent: written,
                        expected: chunk.len(),
                    });
                }
                Err(err) => {
                    self.set_state(ConnectionState::Error);
                    log::error!("connection lost during send: {}", err);
                    return Err(TransmissionError::ConnectionLost(err.to_string()));
                }
            }
        }

        Ok(payload.len())
    }

    /// Best-effort statistics snapshot. Never blocks: if the socket is
    /// busy with a send, the gauges of the previous snapshot are simply
    /// absent. Returns zeroed stats when not connected.
    pub fn stats(&self) -> StreamingStats {
        if self.state() != ConnectionState::Connected {
            return StreamingStats::default();
        }

        let mut stats = StreamingStats {
            packets_sent: self.counters.packets_sent.load(Ordering::Relaxed),
            unique_packets_sent: self.counters.unique_packets_sent.load(Ordering::Relaxed),
            bytes_sent: self.counters.bytes_sent.load(Ordering::Relaxed),
            ..StreamingStats::default()
        };

        if let Ok(slot) = self.socket.try_lock() {
            if let Some(socket) = slot.as_ref() {
                let link = socket.link_stats();
                stats.rtt_ms = link.rtt_ms;
                stats.packet_loss_pct = link.packet_loss_pct;
                stats.bandwidth_estimate_bps = link.bandwidth_estimate_bps;
                stats.congestion_window = link.congestion_window;
                stats.packets_in_flight = link.packets_in_flight;
                stats.retransmitted_packets = link.retransmitted_packets;
                stats.retransmitted_bytes = link.retransmitted_bytes;
                stats.send_drops = link.send_drops;
            }
        }

        if let Ok(mut window) = self.bitrate.try_lock() {
            if let Some(window) = window.as_mut() {
                let elapsed = window.at.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    let delta = stats.bytes_sent.saturating_sub(window.bytes);
                    stats.send_bitrate_bps = delta as f64 * 8.0 / elapsed;
                }
                window.at = Instant::now();
                window.bytes = stats.bytes_sent;
            }
        }

        stats
    }

    /// Query live socket status. Any non-connected status flips the
    /// internal state to `Error` so the failure is observable, not
    /// swallowed.
    pub fn is_healthy(&self) -> bool {
        if self.state() != ConnectionState::Connected {
            return false;
        }

        let status = match self.socket.lock() {
            Ok(slot) => slot
                .as_ref()
                .map(|socket| socket.status())
                .unwrap_or(SocketStatus::Closed),
            Err(_) => SocketStatus::Broken,
        };

        if status != SocketStatus::Connected {
            log::warn!("socket status {:?}, marking connection errored", status);
            self.set_state(ConnectionState::Error);
            return false;
        }

        true
    }

    /// Tear the connection down. Idempotent; safe to call on an already
    /// closed connection or concurrently with an in-flight send.
    pub fn disconnect(&self) {
        if let Ok(mut slot) = self.socket.lock() {
            if let Some(mut socket) = slot.take() {
                socket.close();
                log::info!("transport disconnected");
            }
        }
        self.counters.reset();
        if let Ok(mut window) = self.bitrate.lock() {
            *window = None;
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Install an already connected socket (tests only).
    #[cfg(test)]
    pub(crate) fn connect_with_socket(&self, socket: Box<dyn TransportSocket>) {
        if let Ok(mut slot) = self.socket.lock() {
            *slot = Some(socket);
        }
        self.counters.reset();
        if let Ok(mut window) = self.bitrate.lock() {
            *window = Some(BitrateWindow {
                at: Instant::now(),
                bytes: 0,
            });
        }
        self.set_state(ConnectionState::Connected);
    }
}

impl Default for TransportConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TransportConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}
