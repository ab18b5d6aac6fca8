//! Error types for the streaming pipeline

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Transmission error: {0}")]
    Transmission(#[from] TransmissionError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while establishing a transport connection.
///
/// All of these are fatal to the connect attempt: the socket is closed and
/// the caller must retry explicitly.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Invalid transport configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid target URL: {0}")]
    InvalidUrl(String),

    #[error("Could not resolve host: {0}")]
    AddressResolution(String),

    #[error("Socket creation failed: {0}")]
    SocketCreation(String),

    #[error("Connection timed out after {0} ms")]
    Timeout(u64),
}

/// Errors raised while sending on an established connection.
#[derive(Error, Debug)]
pub enum TransmissionError {
    #[error("Not connected")]
    NotConnected,

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Partial send: wrote {sent} of {expected} bytes")]
    PartialSend { sent: usize, expected: usize },
}

/// Errors raised by media sources and readers.
///
/// All of these are fatal to the current play-through; the session is
/// stopped rather than partially recovered.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("No source loaded")]
    NoSourceLoaded,

    #[error("No audio or video tracks found in source")]
    NoTracksFound,

    #[error("Reader failed: {0}")]
    ReaderFailed(String),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
