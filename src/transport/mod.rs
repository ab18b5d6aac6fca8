//! Transport wrapper: connection lifecycle, chunking, backpressure-aware
//! send, statistics and teardown.
//!
//! The `TransportConnection` owns one outbound socket per instance and
//! splits every payload into chunks no larger than
//! [`crate::constants::MAX_SEGMENT_SIZE`] before handing them to the
//! underlying [`TransportSocket`]. The socket trait is the seam where a
//! reliable-transport binding plugs in; the bundled implementation is a
//! connected UDP datagram socket.

mod connection;
mod packet;
pub(crate) mod socket;
mod stats;
mod url;

pub use connection::{ConnectionState, TransportConnection};
pub use packet::{MediaPacket, PacketKind};
pub use socket::{LinkStats, SocketStatus, TransportSocket, UdpTransportSocket};
pub use stats::StreamingStats;
pub use url::TargetUrl;
