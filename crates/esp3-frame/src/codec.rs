use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::checksum::crc8;
use crate::error::{ChecksumKind, FrameError, Result};

/// Sync byte that starts every frame.
pub const SYNC_BYTE: u8 = 0x55;

/// Sync (1) + data length (2) + optional length (1) + packet type (1) + header CRC (1).
pub const HEADER_SIZE: usize = 6;

/// Largest data payload the 16-bit length field can describe.
pub const MAX_DATA_LEN: usize = u16::MAX as usize;

/// Largest optional payload the 8-bit length field can describe.
pub const MAX_OPTIONAL_LEN: usize = u8::MAX as usize;

/// Largest possible frame on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_DATA_LEN + MAX_OPTIONAL_LEN + 1;

/// Default reader buffer bound: room for two maximal frames.
pub const DEFAULT_MAX_BUFFER: usize = 2 * MAX_FRAME_SIZE;

/// A checksum-verified ESP3 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Packet type byte from the header.
    pub packet_type: u8,
    /// Data payload.
    pub data: Bytes,
    /// Optional payload.
    pub optional: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(packet_type: u8, data: impl Into<Bytes>, optional: impl Into<Bytes>) -> Self {
        Self {
            packet_type,
            data: data.into(),
            optional: optional.into(),
        }
    }

    /// The total wire size of this frame (header + payloads + data CRC).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.data.len() + self.optional.len() + 1
    }

    /// Encode this frame into `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        encode_frame(self.packet_type, &self.data, &self.optional, dst)
    }

    /// Encode this frame into a fresh byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.encode(&mut buf)?;
        Ok(buf.to_vec())
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬───────────┬─────────┬──────┬──────────┬──────────┬──────────┬──────────┐
/// │ Sync │ Data len  │ Opt len │ Type │ CRC8 hdr │ Data     │ Optional │ CRC8 dat │
/// │ 0x55 │ (2B BE)   │ (1B)    │ (1B) │ (1B)     │ (n B)    │ (m B)    │ (1B)     │
/// └──────┴───────────┴─────────┴──────┴──────────┴──────────┴──────────┴──────────┘
/// ```
pub fn encode_frame(packet_type: u8, data: &[u8], optional: &[u8], dst: &mut BytesMut) -> Result<()> {
    if data.len() > MAX_DATA_LEN {
        return Err(FrameError::PayloadTooLarge {
            field: "data",
            size: data.len(),
            max: MAX_DATA_LEN,
        });
    }
    if optional.len() > MAX_OPTIONAL_LEN {
        return Err(FrameError::PayloadTooLarge {
            field: "optional",
            size: optional.len(),
            max: MAX_OPTIONAL_LEN,
        });
    }

    dst.reserve(HEADER_SIZE + data.len() + optional.len() + 1);

    let header = [
        (data.len() >> 8) as u8,
        data.len() as u8,
        optional.len() as u8,
        packet_type,
    ];
    dst.put_u8(SYNC_BYTE);
    dst.put_slice(&header);
    dst.put_u8(crc8(&header));

    let body_start = dst.len();
    dst.put_slice(data);
    dst.put_slice(optional);
    let data_crc = crc8(&dst[body_start..]);
    dst.put_u8(data_crc);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet; a
/// buffer without any sync byte is left untouched. Bytes in front of the
/// first sync byte are dropped. On a checksum mismatch the candidate frame
/// is consumed and the rest of the buffer is kept for the next attempt.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<Frame>> {
    let Some(start) = src.iter().position(|&b| b == SYNC_BYTE) else {
        return Ok(None);
    };
    if start > 0 {
        tracing::debug!(skipped = start, "dropping bytes before sync byte");
        src.advance(start);
    }

    if src.len() < 4 {
        return Ok(None); // Need the length fields
    }

    let data_len = u16::from_be_bytes([src[1], src[2]]) as usize;
    let opt_len = src[3] as usize;
    let total = HEADER_SIZE + data_len + opt_len + 1;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let raw = src.split_to(total).freeze();

    let expected = crc8(&raw[1..5]);
    if raw[5] != expected {
        tracing::warn!(
            expected = expected,
            actual = raw[5],
            "header CRC mismatch, frame discarded"
        );
        return Err(FrameError::ChecksumMismatch {
            kind: ChecksumKind::Header,
            expected,
            actual: raw[5],
        });
    }

    let body_end = HEADER_SIZE + data_len + opt_len;
    let expected = crc8(&raw[HEADER_SIZE..body_end]);
    if raw[body_end] != expected {
        tracing::warn!(
            expected = expected,
            actual = raw[body_end],
            "data CRC mismatch, frame discarded"
        );
        return Err(FrameError::ChecksumMismatch {
            kind: ChecksumKind::Data,
            expected,
            actual: raw[body_end],
        });
    }

    let packet_type = raw[4];
    let data = raw.slice(HEADER_SIZE..HEADER_SIZE + data_len);
    let optional = raw.slice(HEADER_SIZE + data_len..body_end);

    Ok(Some(Frame {
        packet_type,
        data,
        optional,
    }))
}

/// Configuration for frame readers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum number of buffered bytes before the reader resynchronizes.
    /// Default: room for two maximal frames.
    pub max_buffer_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER,
        }
    }
}
