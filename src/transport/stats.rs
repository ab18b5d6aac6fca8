//! Streaming statistics snapshot

/// Best-effort snapshot of a streaming session.
///
/// Accumulating counters never decrease between successive reads within
/// one session; gauges are instantaneous and refreshed on demand. A
/// disconnected transport reports the zeroed default.
#[derive(Debug, Clone, Default)]
pub struct StreamingStats {
    // accumulating counters
    /// Chunks handed to the socket (every one ≤ the segment ceiling)
    pub packets_sent: u64,

    /// Packets sent for the first time (excludes retransmissions)
    pub unique_packets_sent: u64,

    /// Packets retransmitted by the underlying transport
    pub retransmitted_packets: u64,

    /// Payload bytes handed to the socket
    pub bytes_sent: u64,

    /// Bytes retransmitted by the underlying transport
    pub retransmitted_bytes: u64,

    /// Send-side packets dropped by the underlying transport
    pub send_drops: u64,

    /// Video frames handed to the transport by the pacer
    pub frames_sent: u64,

    /// Audio samples handed to the transport by the pacer
    pub samples_sent: u64,

    /// Video frames the pacer gave up on before transmission
    pub frames_dropped: u64,

    // instantaneous gauges
    /// Send bitrate over the window since the previous snapshot, bits/s
    pub send_bitrate_bps: f64,

    /// Round-trip time in milliseconds
    pub rtt_ms: f64,

    /// Send-side packet loss percentage
    pub packet_loss_pct: f64,

    /// Estimated link bandwidth in bits/s
    pub bandwidth_estimate_bps: f64,

    /// Congestion window size in packets
    pub congestion_window: u64,

    /// Packets currently in flight
    pub packets_in_flight: u64,
}

impl std::fmt::Display for StreamingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pkts ({} retrans), {} bytes, {:.0} kbit/s, rtt {:.1} ms, loss {:.2}%",
            self.packets_sent,
            self.retransmitted_packets,
            self.bytes_sent,
            self.send_bitrate_bps / 1000.0,
            self.rtt_ms,
            self.packet_loss_pct
        )
    }
}
