//! Wire framing for outgoing samples

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::pipeline::types::{MediaKind, Sample, Timestamp};

/// One framed media sample as it travels to the receiver.
///
/// Timestamps are microseconds on the transmitted (offset-adjusted)
/// timeline. The payload length rides along so a receiver can validate
/// reassembled packets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPacket {
    pub kind: PacketKind,
    pub pts: i64,
    pub dts: Option<i64>,
    pub duration: i64,
    pub len: usize,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketKind {
    Video,
    Audio,
}

impl From<MediaKind> for PacketKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Video => PacketKind::Video,
            MediaKind::Audio => PacketKind::Audio,
        }
    }
}

impl MediaPacket {
    /// Frame a sample whose timestamps are already offset-adjusted.
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            kind: sample.kind.into(),
            pts: sample.pts.micros,
            dts: sample.dts.map(|dts| dts.micros),
            duration: sample.duration.micros,
            len: sample.data.len(),
            bytes: sample.data.to_vec(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        bincode::serialize(self).map_err(|err| Error::Serialization(err.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let packet: MediaPacket =
            bincode::deserialize(bytes).map_err(|err| Error::Serialization(err.to_string()))?;
        if packet.len != packet.bytes.len() {
            return Err(Error::Serialization(format!(
                "length mismatch: header {} vs payload {}",
                packet.len,
                packet.bytes.len()
            )));
        }
        Ok(packet)
    }

    pub fn pts(&self) -> Timestamp {
        Timestamp::from_micros(self.pts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_frame_and_decode() {
        let sample = Sample::video(
            Bytes::from_static(b"nal-unit"),
            Timestamp::from_secs_f64(1.25),
            None,
            Timestamp::from_micros(33_333),
        );

        let packet = MediaPacket::from_sample(&sample);
        let encoded = packet.encode().unwrap();
        let decoded = MediaPacket::decode(&encoded).unwrap();

        assert_eq!(decoded.kind, PacketKind::Video);
        assert_eq!(decoded.pts, 1_250_000);
        assert_eq!(decoded.bytes, b"nal-unit");
        assert_eq!(decoded.len, 8);
    }

    #[test]
    fn test_decode_rejects_length_mismatch() {
        let mut packet = MediaPacket {
            kind: PacketKind::Audio,
            pts: 0,
            dts: None,
            duration: 0,
            len: 99,
            bytes: vec![1, 2, 3],
        };
        let encoded = bincode::serialize(&packet).unwrap();
        assert!(MediaPacket::decode(&encoded).is_err());

        packet.len = 3;
        let encoded = packet.encode().unwrap();
        assert!(MediaPacket::decode(&encoded).is_ok());
    }
}
