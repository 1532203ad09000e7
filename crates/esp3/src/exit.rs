use std::fmt;
use std::io;

use esp3_eep::EepError;
use esp3_frame::FrameError;
use esp3_packet::PacketError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ChecksumMismatch { .. } | FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn eep_error(context: &str, err: EepError) -> CliError {
    match err {
        EepError::LoadFailed(_) | EepError::Json(_) | EepError::InvalidProfile { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        EepError::ProfileNotFound { .. }
        | EepError::UnknownField(_)
        | EepError::ValueOutOfRange { .. }
        | EepError::UnknownLabel { .. }
        | EepError::InvalidProfileId(_) => CliError::usage(format!("{context}: {err}")),
        EepError::FieldOutOfBounds { .. } => {
            CliError::new(INTERNAL, format!("{context}: {err}"))
        }
    }
}

pub fn packet_error(context: &str, err: PacketError) -> CliError {
    match err {
        PacketError::Frame(err) => frame_error(context, err),
        PacketError::Eep(err) => eep_error(context, err),
        PacketError::UnsupportedPacketType(_)
        | PacketError::UnsupportedCategory(_)
        | PacketError::InvalidAddress(_)
        | PacketError::InvalidCommand { .. }
        | PacketError::InvalidManufacturer(_)
        | PacketError::MissingSender => CliError::usage(format!("{context}: {err}")),
        PacketError::Malformed(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_packet_errors_to_exit_codes() {
        let err = packet_error("encode failed", PacketError::MissingSender);
        assert_eq!(err.code, USAGE);
        assert_eq!(err.to_string(), "encode failed: sender address required");

        let err = packet_error(
            "decode failed",
            PacketError::Frame(FrameError::ChecksumMismatch {
                kind: esp3_frame::ChecksumKind::Header,
                expected: 0x7A,
                actual: 0x00,
            }),
        );
        assert_eq!(err.code, DATA_INVALID);

        let err = packet_error(
            "read failed",
            PacketError::Frame(FrameError::Io(io::Error::from(io::ErrorKind::NotFound))),
        );
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn maps_catalog_errors() {
        assert_eq!(
            eep_error("load", EepError::LoadFailed("x".into())).code,
            DATA_INVALID
        );
        assert_eq!(eep_error("set", EepError::UnknownField("X".into())).code, USAGE);
    }
}
