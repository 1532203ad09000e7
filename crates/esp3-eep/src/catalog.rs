use std::collections::BTreeMap;

use serde::Serialize;

use crate::codec::{decode_fields, encode_fields, DecodedField, FieldInput};
use crate::error::Result;
use crate::profile::{DataBlock, FieldKind, Profile, ProfileId};

/// Read access to profile definitions.
///
/// The packet layer only talks to this trait, so any source of profiles
/// (the bundled registry, a cache, a test double) can be injected.
pub trait ProfileCatalog {
    /// Profile by identifier.
    fn profile(&self, id: &ProfileId) -> Option<&Profile>;

    /// Resolve the profile and the data block matching `direction` /
    /// `command`.
    fn find_profile(
        &self,
        id: &ProfileId,
        direction: Option<u8>,
        command: Option<u8>,
    ) -> Option<ResolvedProfile<'_>> {
        let Some(profile) = self.profile(id) else {
            tracing::debug!(profile = %id, "profile not in catalog");
            return None;
        };
        let Some(block) = profile.block(direction, command) else {
            tracing::debug!(
                profile = %id,
                ?direction,
                ?command,
                "no data block for direction/command"
            );
            return None;
        };
        Some(ResolvedProfile { profile, block })
    }

    /// Metadata for a single field shortcut.
    fn field_metadata(&self, id: &ProfileId, shortcut: &str) -> Option<FieldMetadata> {
        self.fields(id).remove(shortcut)
    }

    /// Metadata for every value and enum field of a profile, across all of
    /// its data blocks. Later blocks win on shortcut collisions.
    fn fields(&self, id: &ProfileId) -> BTreeMap<String, FieldMetadata> {
        let Some(profile) = self.profile(id) else {
            return BTreeMap::new();
        };
        profile
            .blocks
            .iter()
            .flat_map(|block| &block.fields)
            .filter(|field| field.kind != FieldKind::Status)
            .map(|field| {
                let metadata = FieldMetadata {
                    name: field.description.clone(),
                    unit: field.unit.clone(),
                    enum_map: field.enum_map(),
                };
                (field.shortcut.clone(), metadata)
            })
            .collect()
    }
}

/// A profile narrowed to the data block that applies to one telegram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedProfile<'a> {
    pub profile: &'a Profile,
    pub block: &'a DataBlock,
}

impl ResolvedProfile<'_> {
    pub fn id(&self) -> ProfileId {
        self.profile.id
    }

    /// Decode every field of the block.
    pub fn decode(&self, bits: &[bool], status: &[bool]) -> Vec<DecodedField> {
        decode_fields(self.block, bits, status)
    }

    /// Write named values into payload and status bits.
    pub fn encode<'v, I>(&self, bits: &mut [bool], status: &mut [bool], values: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'v str, &'v FieldInput)>,
    {
        encode_fields(self.block, bits, status, values)
    }
}

/// Descriptive metadata of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub enum_map: BTreeMap<u64, String>,
}
