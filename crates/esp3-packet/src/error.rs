/// Errors that can occur while parsing or building packets.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] esp3_frame::FrameError),

    /// Profile lookup or field codec error.
    #[error("profile error: {0}")]
    Eep(#[from] esp3_eep::EepError),

    /// The packet type cannot be built.
    #[error("unsupported packet type 0x{0:02X}")]
    UnsupportedPacketType(u8),

    /// The telegram category cannot be built.
    #[error("unsupported telegram category 0x{0:02X}")]
    UnsupportedCategory(u8),

    /// A device address could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A manufacturer command does not fit its header field.
    #[error("command {command} does not fit manufacturer 0x{manufacturer:03X} header")]
    InvalidCommand { manufacturer: u16, command: u8 },

    /// A manufacturer id does not fit 11 bits.
    #[error("manufacturer id 0x{0:X} out of range")]
    InvalidManufacturer(u16),

    /// The builder needs a sender address.
    #[error("sender address required")]
    MissingSender,

    /// A built packet did not survive its own frame round trip.
    #[error("malformed packet: {0}")]
    Malformed(&'static str),
}

pub type Result<T> = std::result::Result<T, PacketError>;
