use std::fmt;

/// Which of the two frame checksums failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    /// CRC over the four header bytes.
    Header,
    /// CRC over the data and optional payloads.
    Data,
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumKind::Header => f.write_str("header"),
            ChecksumKind::Data => f.write_str("data"),
        }
    }
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A checksum did not match; the offending frame was discarded.
    #[error("{kind} checksum mismatch (expected 0x{expected:02X}, got 0x{actual:02X})")]
    ChecksumMismatch {
        kind: ChecksumKind,
        expected: u8,
        actual: u8,
    },

    /// The payload does not fit the length fields of the frame header.
    #[error("{field} payload too large ({size} bytes, max {max})")]
    PayloadTooLarge {
        field: &'static str,
        size: usize,
        max: usize,
    },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte source was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
