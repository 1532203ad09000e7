//! ESP3 serial framing.
//!
//! Every telegram exchanged with the radio module is wrapped in a frame:
//! - A sync byte (`0x55`) for stream synchronization
//! - A 4-byte header (data length, optional length, packet type) guarded by a CRC-8
//! - The data and optional payloads guarded by a second CRC-8
//!
//! Callers get whole, checksum-verified frames; partial reads and resync are
//! handled here.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod packet_type;
pub mod reader;
pub mod writer;

pub use checksum::crc8;
pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, HEADER_SIZE, MAX_DATA_LEN, MAX_FRAME_SIZE,
    MAX_OPTIONAL_LEN, SYNC_BYTE,
};
pub use error::{ChecksumKind, FrameError, Result};
pub use packet_type::{packet_type_name, EVENT, RADIO_ERP1, RESPONSE};
pub use reader::FrameReader;
pub use writer::FrameWriter;
