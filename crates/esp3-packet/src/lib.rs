//! ESP3 packet model.
//!
//! Frames from [`esp3_frame`] become [`Packet`]s: radio telegrams with
//! sender, destination and signal level, universal teach-in queries,
//! manufacturer-specific telegrams, responses and events. A
//! [`PacketDecoder`] reassembles chained telegrams and decodes payload
//! fields through an [`esp3_eep::ProfileCatalog`]; [`RadioBuilder`] and
//! [`MscBuilder`] go the other way.

pub mod address;
pub mod builder;
pub mod chain;
pub mod decoder;
pub mod error;
pub mod packet;
pub mod radio;
pub mod rorg;
pub mod teach_in;

pub use address::Address;
pub use builder::{MscBuilder, RadioBuilder};
pub use chain::{
    ChainConfig, ChainFragment, ChainFraming, ChainProgress, ChainStore, CompletedChain,
};
pub use decoder::{Decoded, DecoderConfig, PacketDecoder, SharedCatalog};
pub use error::{PacketError, Result};
pub use packet::{
    classify, return_code_name, ChainedInfo, EventInfo, Packet, PacketClass, PacketKind,
    ResponseInfo,
};
pub use radio::RadioInfo;
pub use teach_in::{TeachInInfo, TeachInRequest, TeachInResponse};
