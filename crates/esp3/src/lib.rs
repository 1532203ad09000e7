//! EnOcean Serial Protocol 3 (ESP3).
//!
//! # Crate Structure
//!
//! - [`frame`]: sync byte, length fields and CRC-8 framing over any byte stream
//! - [`eep`]: profile catalog and the bit-field codec driven by it
//! - [`packet`]: packet model, teach-in, chained reassembly and builders

/// Re-export frame types.
pub mod frame {
    pub use esp3_frame::*;
}

/// Re-export profile types.
pub mod eep {
    pub use esp3_eep::*;
}

/// Re-export packet types.
pub mod packet {
    pub use esp3_packet::*;
}

pub use esp3_eep::{ProfileCatalog, ProfileId, ProfileRegistry};
pub use esp3_frame::{Frame, FrameReader, FrameWriter};
pub use esp3_packet::{Address, Decoded, Packet, PacketDecoder, PacketKind};
