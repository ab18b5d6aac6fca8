//! Transport and session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_LATENCY_MS};

/// Connection parameters for the transport.
///
/// Immutable once handed to `TransportConnection::connect`. Options the
/// underlying socket family cannot express are advisory and logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Receiver target as `scheme://host:port`; host may be a literal
    /// address or a name requiring resolution.
    pub target: String,

    /// Receiver buffering latency budget in milliseconds (typical 120–2000).
    pub latency_ms: u32,

    /// Optional bandwidth ceiling in bits per second.
    pub max_bandwidth_bps: Option<u64>,

    /// Optional pre-shared encryption passphrase.
    pub passphrase: Option<String>,

    /// Encryption key length in bytes (16, 24 or 32).
    pub key_length: u8,

    /// Optional free-form stream identifier announced to the receiver.
    pub stream_id: Option<String>,

    /// Socket send buffer size in bytes, if overridden.
    pub send_buffer_size: Option<usize>,

    /// Socket receive buffer size in bytes, if overridden.
    pub recv_buffer_size: Option<usize>,

    /// Connection handshake timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            latency_ms: DEFAULT_LATENCY_MS,
            max_bandwidth_bps: None,
            passphrase: None,
            key_length: 16,
            stream_id: None,
            send_buffer_size: None,
            recv_buffer_size: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl TransportConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn with_latency_ms(mut self, latency_ms: u32) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    pub fn with_stream_id(mut self, stream_id: impl Into<String>) -> Self {
        self.stream_id = Some(stream_id.into());
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Validate option ranges that the transport cannot repair on its own.
    pub fn validate(&self) -> Result<(), String> {
        if self.passphrase.is_some() && !matches!(self.key_length, 16 | 24 | 32) {
            return Err(format!(
                "invalid key length {} (want 16, 24 or 32)",
                self.key_length
            ));
        }
        if self.latency_ms == 0 {
            return Err("latency budget must be non-zero".into());
        }
        Ok(())
    }
}

/// Per-session playback options.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Restart the source from zero when a play-through completes.
    pub looping: bool,

    /// Play-through start offset in seconds into the source.
    pub start_time: f64,

    /// Pace output to the source's frame cadence. Disabled for
    /// faster-than-realtime pushes.
    pub realtime: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            looping: false,
            start_time: 0.0,
            realtime: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.latency_ms, DEFAULT_LATENCY_MS);
        assert_eq!(config.connect_timeout_ms, DEFAULT_CONNECT_TIMEOUT_MS);
        assert!(config.passphrase.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_key_length_validation() {
        let config = TransportConfig::default().with_passphrase("secret");
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.key_length = 20;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = TransportConfig::default()
            .with_latency_ms(400)
            .with_stream_id("publish/live/feed");
        let json = serde_json::to_string(&config).unwrap();
        let back: TransportConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.latency_ms, 400);
        assert_eq!(back.stream_id.as_deref(), Some("publish/live/feed"));
    }
}
