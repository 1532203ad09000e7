//! Profile catalog and field codec for ESP3 radio telegrams.
//!
//! A profile (EEP) maps bit ranges of a telegram payload to named values.
//! This crate holds the profile model, an in-memory [`ProfileRegistry`]
//! loaded from JSON documents, and the codec that turns payload bits into
//! [`DecodedField`]s and named [`FieldInput`]s back into bits.
//!
//! The packet layer consumes profiles only through the [`ProfileCatalog`]
//! trait.

pub mod bits;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod profile;
pub mod registry;

pub use catalog::{FieldMetadata, ProfileCatalog, ResolvedProfile};
pub use codec::{decode_fields, encode_fields, DecodedField, FieldInput, FieldValue};
pub use config::RegistryConfig;
pub use error::{EepError, Result};
pub use profile::{
    Bounds, CommandSelector, DataBlock, EnumItem, FieldDescriptor, FieldKind, Profile, ProfileId,
    RangeItem, ENUM_EXPANSION_LIMIT,
};
pub use registry::{ProfileRegistry, BUILTIN_PROFILES};
