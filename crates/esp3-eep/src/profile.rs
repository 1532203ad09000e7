//! Profile documents.
//!
//! A profile describes one `(rorg, func, type)` triple as one or more data
//! blocks, each an ordered list of field descriptors. Profiles are plain
//! serde types so they can be loaded from JSON:
//!
//! ```json
//! {
//!   "eep": "A5-02-05",
//!   "description": "Temperature sensor, 0 to 40 C",
//!   "data": [{
//!     "bytes": 4,
//!     "fields": [
//!       { "kind": "value", "shortcut": "TMP", "description": "Temperature",
//!         "offset": 16, "size": 8, "unit": "C",
//!         "range": { "min": 255, "max": 0 }, "scale": { "min": 0, "max": 40 } }
//!     ]
//!   }]
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EepError, Result};

/// `(rorg, func, type)` identifier of a profile.
///
/// `rorg` is wider than a byte because manufacturer-specific profiles are
/// keyed by `(0xD1 << 12) | manufacturer`, e.g. `D1079-01-00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileId {
    pub rorg: u32,
    pub func: u8,
    pub type_: u8,
}

impl ProfileId {
    pub const fn new(rorg: u32, func: u8, type_: u8) -> Self {
        Self { rorg, func, type_ }
    }

    /// Catalog rorg for a manufacturer-specific telegram.
    pub const fn msc_rorg(manufacturer: u16) -> u32 {
        (0xD1 << 12) | (manufacturer as u32 & 0xFFF)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}-{:02X}-{:02X}", self.rorg, self.func, self.type_)
    }
}

impl FromStr for ProfileId {
    type Err = EepError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || EepError::InvalidProfileId(s.to_string());
        let mut parts = s.trim().split(['-', ':']);
        let (Some(rorg), Some(func), Some(type_), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let hex = |part: &str| {
            let part = part
                .strip_prefix("0x")
                .or_else(|| part.strip_prefix("0X"))
                .unwrap_or(part);
            u32::from_str_radix(part, 16).map_err(|_| invalid())
        };
        let narrow = |value: u32| u8::try_from(value).map_err(|_| invalid());

        Ok(Self {
            rorg: hex(rorg)?,
            func: narrow(hex(func)?)?,
            type_: narrow(hex(type_)?)?,
        })
    }
}

impl TryFrom<String> for ProfileId {
    type Error = EepError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ProfileId> for String {
    fn from(id: ProfileId) -> Self {
        id.to_string()
    }
}

/// Schema for one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "eep")]
    pub id: ProfileId,
    #[serde(default)]
    pub description: String,
    /// Where the command identifier sits in the payload, for profiles whose
    /// blocks are selected by command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandSelector>,
    #[serde(rename = "data")]
    pub blocks: Vec<DataBlock>,
}

impl Profile {
    /// Whether data blocks are selected by command.
    pub fn has_commands(&self) -> bool {
        self.command.is_some() || self.blocks.iter().any(|block| block.command.is_some())
    }

    /// Select the data block for a direction and/or command.
    ///
    /// With a command, the block tagged with that command is returned when
    /// the profile is command-driven, otherwise the first block. Without a
    /// command the first block is returned, or the block tagged with
    /// `direction` when one is given.
    pub fn block(&self, direction: Option<u8>, command: Option<u8>) -> Option<&DataBlock> {
        match (command, direction) {
            (Some(command), _) if self.has_commands() => self
                .blocks
                .iter()
                .find(|block| block.command == Some(command)),
            (Some(_), _) | (None, None) => self.blocks.first(),
            (None, Some(direction)) => self
                .blocks
                .iter()
                .find(|block| block.direction == Some(direction)),
        }
    }

    /// Read the command identifier from a payload using the selector.
    pub fn command_of(&self, bits: &[bool]) -> Option<u8> {
        let selector = self.command?;
        crate::bits::read_bits(bits, selector.offset, selector.size)
            .and_then(|value| u8::try_from(value).ok())
    }

    /// Check the structural rules applied by strict registries.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| EepError::InvalidProfile {
            id: self.id.to_string(),
            reason,
        };

        if self.blocks.is_empty() {
            return Err(invalid("no data blocks".into()));
        }

        if let Some(selector) = self.command {
            if selector.size == 0 || selector.size > 8 {
                return Err(invalid(format!("command selector width {}", selector.size)));
            }
        }

        let mut commands = HashSet::new();
        for block in &self.blocks {
            if let Some(command) = block.command {
                if !commands.insert(command) {
                    return Err(invalid(format!("duplicate block for command {command}")));
                }
            }
            block.validate().map_err(invalid)?;
        }
        Ok(())
    }
}

/// Location of the command identifier in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSelector {
    pub offset: usize,
    pub size: usize,
}

/// One data layout of a profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<u8>,
    /// Declared payload size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    pub fields: Vec<FieldDescriptor>,
}

impl DataBlock {
    pub fn field(&self, shortcut: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.shortcut == shortcut)
    }

    pub fn has_field(&self, shortcut: &str) -> bool {
        self.field(shortcut).is_some()
    }

    /// Payload size in bytes: the declared size, or enough bytes to hold
    /// every payload field.
    pub fn byte_len(&self) -> usize {
        self.bytes.unwrap_or_else(|| {
            let bits = self
                .fields
                .iter()
                .filter(|field| field.kind != FieldKind::Status)
                .map(|field| field.offset + field.size)
                .max()
                .unwrap_or(0);
            bits.div_ceil(8)
        })
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.shortcut.as_str()) {
                return Err(format!("duplicate field {}", field.shortcut));
            }
            if field.size == 0 || field.size > 64 {
                return Err(format!("field {} has width {}", field.shortcut, field.size));
            }

            let limit = match field.kind {
                FieldKind::Status => Some(8),
                _ => self.bytes.map(|bytes| bytes * 8),
            };
            if let Some(limit) = limit {
                if field.offset + field.size > limit {
                    return Err(format!(
                        "field {} ends at bit {} beyond {limit}",
                        field.shortcut,
                        field.offset + field.size
                    ));
                }
            }

            for item in &field.range_items {
                if item.start > item.end || item.end > field.max_raw() {
                    return Err(format!(
                        "field {} has range item {}..={}",
                        field.shortcut, item.start, item.end
                    ));
                }
            }
            if !field.range_fits() {
                return Err(format!(
                    "field {} has a range outside its {} bits",
                    field.shortcut, field.size
                ));
            }
            if let (Some(range), Some(_)) = (field.range, field.scale) {
                if range.min == range.max {
                    return Err(format!("field {} has an empty range", field.shortcut));
                }
            }
        }
        Ok(())
    }
}

/// How a field is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Numeric value, optionally scaled.
    Value,
    /// Enumerated value mapped to labels.
    Enum,
    /// Flag read from the status byte.
    Status,
}

/// Closed interval used for raw ranges and engineering scales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumItem {
    pub value: u64,
    pub description: String,
}

/// Range items spanning more values than this are not expanded into
/// [`FieldDescriptor::enum_map`].
pub const ENUM_EXPANSION_LIMIT: u64 = 4096;

/// Contiguous enum values sharing a description template; `{value}` in the
/// description is replaced by the concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeItem {
    pub start: u64,
    pub end: u64,
    pub description: String,
}

impl RangeItem {
    fn is_expandable(&self) -> bool {
        self.start <= self.end && self.end - self.start < ENUM_EXPANSION_LIMIT
    }
}

/// One field of a data block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub kind: FieldKind,
    pub shortcut: String,
    #[serde(default)]
    pub description: String,
    /// Bit offset from the MSB of the payload (or of the status byte).
    pub offset: usize,
    /// Width in bits.
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<EnumItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub range_items: Vec<RangeItem>,
}

impl FieldDescriptor {
    /// Largest raw value the field can hold.
    pub fn max_raw(&self) -> u64 {
        if self.size >= 64 {
            u64::MAX
        } else {
            (1u64 << self.size) - 1
        }
    }

    /// Enum label for a raw value.
    pub fn label_for(&self, raw: u64) -> Option<String> {
        if let Some(item) = self.items.iter().find(|item| item.value == raw) {
            return Some(item.description.clone());
        }
        self.range_items
            .iter()
            .find(|item| (item.start..=item.end).contains(&raw))
            .map(|item| item.description.replace("{value}", &raw.to_string()))
    }

    /// Raw value carrying `label`, if any item (or range item template)
    /// produces it.
    pub fn raw_for_label(&self, label: &str) -> Option<u64> {
        if let Some(item) = self.items.iter().find(|item| item.description == label) {
            return Some(item.value);
        }
        self.range_items.iter().find_map(|item| {
            match item.description.split_once("{value}") {
                Some((prefix, suffix)) => label
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_suffix(suffix))
                    .and_then(|digits| digits.parse::<u64>().ok())
                    .filter(|value| (item.start..=item.end).contains(value)),
                None => (item.description == label).then_some(item.start),
            }
        })
    }

    /// Every raw value with a label. Range items spanning more than
    /// [`ENUM_EXPANSION_LIMIT`] values are left out; [`Self::label_for`]
    /// still resolves them.
    pub fn enum_map(&self) -> BTreeMap<u64, String> {
        let mut map = BTreeMap::new();
        for item in self.range_items.iter().filter(|item| item.is_expandable()) {
            for value in item.start..=item.end {
                map.insert(value, item.description.replace("{value}", &value.to_string()));
            }
        }
        for item in &self.items {
            map.insert(item.value, item.description.clone());
        }
        map
    }

    /// Raw value mapped onto the engineering scale, when both are declared.
    pub fn scaled(&self, raw: u64) -> f64 {
        match (self.range, self.scale) {
            (Some(range), Some(scale)) if range.max != range.min => {
                (scale.max - scale.min) / (range.max - range.min) * (raw as f64 - range.min)
                    + scale.min
            }
            _ => raw as f64,
        }
    }

    /// Engineering value mapped back to the nearest raw value, clamped to
    /// the declared range (or the field width).
    ///
    /// Fails when the declared range has no overlap with the field width.
    pub fn unscaled(&self, value: f64) -> Result<u64> {
        let (raw, low, high) = match (self.range, self.scale) {
            (Some(range), Some(scale)) if scale.max != scale.min => (
                (value - scale.min) * (range.max - range.min) / (scale.max - scale.min)
                    + range.min,
                range.min.min(range.max),
                range.min.max(range.max),
            ),
            _ => (value, 0.0, self.max_raw() as f64),
        };
        let low = low.max(0.0);
        let high = high.min(self.max_raw() as f64);
        if !raw.is_finite() || low > high {
            return Err(EepError::ValueOutOfRange {
                shortcut: self.shortcut.clone(),
                value: value.to_string(),
                max: self.max_raw(),
            });
        }
        Ok(raw.round().clamp(low, high) as u64)
    }

    /// Whether the declared range lies within the field width.
    pub fn range_fits(&self) -> bool {
        self.range.is_none_or(|range| {
            let max_raw = self.max_raw() as f64;
            range.min >= 0.0 && range.max >= 0.0 && range.min <= max_raw && range.max <= max_raw
        })
    }
}

/// A JSON document holding one profile or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProfileDocument {
    Many(Vec<Profile>),
    One(Profile),
}

impl ProfileDocument {
    pub(crate) fn into_profiles(self) -> Vec<Profile> {
        match self {
            ProfileDocument::Many(profiles) => profiles,
            ProfileDocument::One(profile) => vec![profile],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(kind: FieldKind, shortcut: &str, offset: usize, size: usize) -> FieldDescriptor {
        FieldDescriptor {
            kind,
            shortcut: shortcut.into(),
            description: String::new(),
            offset,
            size,
            unit: None,
            range: None,
            scale: None,
            items: Vec::new(),
            range_items: Vec::new(),
        }
    }

    fn block(direction: Option<u8>, command: Option<u8>) -> DataBlock {
        DataBlock {
            direction,
            command,
            bytes: Some(1),
            fields: vec![field(FieldKind::Value, "X", 0, 8)],
        }
    }

    #[test]
    fn profile_id_display_and_parse() {
        let id: ProfileId = "A5-02-05".parse().unwrap();
        assert_eq!(id, ProfileId::new(0xA5, 0x02, 0x05));
        assert_eq!(id.to_string(), "A5-02-05");

        let msc: ProfileId = "0xD1079-0x01-0x00".parse().unwrap();
        assert_eq!(msc.rorg, ProfileId::msc_rorg(0x079));
        assert_eq!(msc.to_string(), "D1079-01-00");

        assert!("A5-02".parse::<ProfileId>().is_err());
        assert!("A5-02-05-01".parse::<ProfileId>().is_err());
        assert!("A5-102-05".parse::<ProfileId>().is_err());
        assert!("ZZ-02-05".parse::<ProfileId>().is_err());
    }

    #[test]
    fn block_selection_by_direction() {
        let profile = Profile {
            id: ProfileId::new(0xD2, 0x05, 0x00),
            description: String::new(),
            command: None,
            blocks: vec![block(Some(1), None), block(Some(2), None)],
        };
        assert_eq!(profile.block(None, None), profile.blocks.first());
        assert_eq!(profile.block(Some(2), None), profile.blocks.get(1));
        assert_eq!(profile.block(Some(3), None), None);
        // Not command-driven: fall back to the first block.
        assert_eq!(profile.block(None, Some(4)), profile.blocks.first());
    }

    #[test]
    fn block_selection_by_command() {
        let profile = Profile {
            id: ProfileId::new(0xD2, 0x01, 0x01),
            description: String::new(),
            command: Some(CommandSelector { offset: 4, size: 4 }),
            blocks: vec![block(None, Some(1)), block(None, Some(4))],
        };
        assert_eq!(profile.block(None, Some(4)), profile.blocks.get(1));
        assert_eq!(profile.block(Some(1), Some(4)), profile.blocks.get(1));
        assert_eq!(profile.block(None, Some(9)), None);
        assert_eq!(profile.block(None, None), profile.blocks.first());

        let bits = crate::bits::bytes_to_bits(&[0x04], 8);
        assert_eq!(profile.command_of(&bits), Some(4));
    }

    #[test]
    fn enum_labels_and_templates() {
        let mut f = field(FieldKind::Enum, "SP", 0, 8);
        f.items = vec![EnumItem {
            value: 0,
            description: "Off".into(),
        }];
        f.range_items = vec![RangeItem {
            start: 1,
            end: 100,
            description: "Speed {value}%".into(),
        }];

        assert_eq!(f.label_for(0).as_deref(), Some("Off"));
        assert_eq!(f.label_for(42).as_deref(), Some("Speed 42%"));
        assert_eq!(f.label_for(101), None);

        assert_eq!(f.raw_for_label("Off"), Some(0));
        assert_eq!(f.raw_for_label("Speed 7%"), Some(7));
        assert_eq!(f.raw_for_label("Speed 700%"), None);
        assert_eq!(f.raw_for_label("Fast"), None);

        let map = f.enum_map();
        assert_eq!(map.len(), 101);
        assert_eq!(map.get(&100).map(String::as_str), Some("Speed 100%"));
    }

    #[test]
    fn scaling_roundtrip_with_inverted_range() {
        let mut f = field(FieldKind::Value, "TMP", 16, 8);
        f.range = Some(Bounds { min: 255.0, max: 0.0 });
        f.scale = Some(Bounds { min: 0.0, max: 40.0 });

        assert!(f.scaled(255).abs() < 1e-9);
        assert!((f.scaled(0) - 40.0).abs() < 1e-9);
        assert_eq!(f.unscaled(20.0).unwrap(), 128);
        assert_eq!(f.unscaled(-5.0).unwrap(), 255);
        assert_eq!(f.unscaled(50.0).unwrap(), 0);
    }

    #[test]
    fn unscaled_without_scale_clamps_to_width() {
        let f = field(FieldKind::Value, "N", 0, 4);
        assert_eq!(f.scaled(9), 9.0);
        assert_eq!(f.unscaled(9.4).unwrap(), 9);
        assert_eq!(f.unscaled(99.0).unwrap(), 15);
    }

    #[test]
    fn range_wider_than_field_is_rejected() {
        let mut f = field(FieldKind::Value, "X", 0, 8);
        f.range = Some(Bounds { min: 300.0, max: 400.0 });
        f.scale = Some(Bounds { min: 0.0, max: 10.0 });

        assert!(!f.range_fits());
        assert!(matches!(
            f.unscaled(5.0),
            Err(EepError::ValueOutOfRange { ref shortcut, max: 255, .. }) if shortcut == "X"
        ));

        let profile = Profile {
            id: ProfileId::new(0xA5, 0x99, 0x02),
            description: String::new(),
            command: None,
            blocks: vec![DataBlock {
                direction: None,
                command: None,
                bytes: Some(1),
                fields: vec![f],
            }],
        };
        assert!(matches!(
            profile.validate(),
            Err(EepError::InvalidProfile { .. })
        ));
    }

    #[test]
    fn wide_range_items_not_expanded() {
        let mut f = field(FieldKind::Enum, "ID", 0, 32);
        f.range_items = vec![
            RangeItem {
                start: 0,
                end: 9,
                description: "Slot {value}".into(),
            },
            RangeItem {
                start: 10,
                end: u64::from(u32::MAX),
                description: "Device {value}".into(),
            },
        ];

        let map = f.enum_map();
        assert_eq!(map.len(), 10);
        assert_eq!(f.label_for(70_000).as_deref(), Some("Device 70000"));
    }

    #[test]
    fn byte_len_declared_or_derived() {
        let mut b = block(None, None);
        assert_eq!(b.byte_len(), 1);
        b.bytes = None;
        b.fields.push(field(FieldKind::Value, "Y", 8, 3));
        b.fields.push(field(FieldKind::Status, "T21", 2, 1));
        assert_eq!(b.byte_len(), 2);
    }

    #[test]
    fn validate_rejects_structural_errors() {
        let mut profile = Profile {
            id: ProfileId::new(0xF6, 0x02, 0x01),
            description: String::new(),
            command: None,
            blocks: vec![block(None, None)],
        };
        assert!(profile.validate().is_ok());

        profile.blocks[0].fields.push(field(FieldKind::Value, "X", 0, 1));
        assert!(matches!(
            profile.validate(),
            Err(EepError::InvalidProfile { .. })
        ));

        profile.blocks[0].fields[1] = field(FieldKind::Value, "Z", 4, 8);
        assert!(profile.validate().is_err());

        profile.blocks[0].fields[1] = field(FieldKind::Status, "T21", 2, 1);
        assert!(profile.validate().is_ok());

        profile.blocks.clear();
        assert!(profile.validate().is_err());
    }

    #[test]
    fn document_accepts_one_or_many() {
        let one = r#"{"eep":"F6-02-01","data":[{"fields":[]}]}"#;
        let many = r#"[{"eep":"F6-02-01","data":[]},{"eep":"F6-02-02","data":[]}]"#;

        let doc: ProfileDocument = serde_json::from_str(one).unwrap();
        assert_eq!(doc.into_profiles().len(), 1);
        let doc: ProfileDocument = serde_json::from_str(many).unwrap();
        assert_eq!(doc.into_profiles().len(), 2);
    }
}
