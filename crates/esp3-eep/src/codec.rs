//! Field codec: bit ranges to named values and back.

use serde::{Deserialize, Serialize};

use crate::bits::{read_bits, write_bits};
use crate::error::{EepError, Result};
use crate::profile::{DataBlock, FieldDescriptor, FieldKind};

/// A decoded field. `raw_value` is always the unsigned integer read from
/// the bit range; `value` is its interpretation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedField {
    pub shortcut: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub raw_value: u64,
    pub value: FieldValue,
}

/// Interpretation of a raw field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Enum label.
    Label(String),
    /// Numeric value, mapped onto the engineering scale when the field
    /// declares one.
    Scaled(f64),
    /// Status flag.
    Flag(bool),
}

impl FieldValue {
    pub fn as_label(&self) -> Option<&str> {
        match self {
            FieldValue::Label(label) => Some(label),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Scaled(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(flag) => Some(*flag),
            _ => None,
        }
    }
}

/// A value to encode into a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldInput {
    /// Raw integer written as-is.
    Raw(u64),
    /// Engineering value converted back through the field's scale.
    Scaled(f64),
    /// Enum label.
    Label(String),
    Flag(bool),
}

impl From<u64> for FieldInput {
    fn from(value: u64) -> Self {
        FieldInput::Raw(value)
    }
}

impl From<f64> for FieldInput {
    fn from(value: f64) -> Self {
        FieldInput::Scaled(value)
    }
}

impl From<&str> for FieldInput {
    fn from(label: &str) -> Self {
        FieldInput::Label(label.to_string())
    }
}

impl From<bool> for FieldInput {
    fn from(flag: bool) -> Self {
        FieldInput::Flag(flag)
    }
}

/// Decode every field of `block` in document order.
///
/// Status fields read from `status`, all others from `bits`. Fields whose
/// bit range lies outside the source, and enum values without a matching
/// item, are left out.
pub fn decode_fields(block: &DataBlock, bits: &[bool], status: &[bool]) -> Vec<DecodedField> {
    block
        .fields
        .iter()
        .filter_map(|field| decode_field(field, bits, status))
        .collect()
}

fn decode_field(field: &FieldDescriptor, bits: &[bool], status: &[bool]) -> Option<DecodedField> {
    let source = match field.kind {
        FieldKind::Status => status,
        _ => bits,
    };
    let Some(raw) = read_bits(source, field.offset, field.size) else {
        tracing::trace!(
            shortcut = %field.shortcut,
            offset = field.offset,
            size = field.size,
            available = source.len(),
            "field outside payload"
        );
        return None;
    };

    let value = match field.kind {
        FieldKind::Value => FieldValue::Scaled(field.scaled(raw)),
        FieldKind::Status => FieldValue::Flag(raw != 0),
        FieldKind::Enum => match field.label_for(raw) {
            Some(label) => FieldValue::Label(label),
            None => {
                tracing::debug!(shortcut = %field.shortcut, raw, "enum value without item");
                return None;
            }
        },
    };

    Some(DecodedField {
        shortcut: field.shortcut.clone(),
        description: field.description.clone(),
        unit: field.unit.clone(),
        raw_value: raw,
        value,
    })
}

/// Write named values into `bits` / `status`.
///
/// Every value is checked before anything is written, so on error both
/// buffers are untouched. Fields that are not named keep their bits.
pub fn encode_fields<'v, I>(
    block: &DataBlock,
    bits: &mut [bool],
    status: &mut [bool],
    values: I,
) -> Result<()>
where
    I: IntoIterator<Item = (&'v str, &'v FieldInput)>,
{
    let mut writes = Vec::new();
    for (shortcut, input) in values {
        let field = block
            .field(shortcut)
            .ok_or_else(|| EepError::UnknownField(shortcut.to_string()))?;
        let raw = raw_for_input(field, input)?;

        let len = match field.kind {
            FieldKind::Status => status.len(),
            _ => bits.len(),
        };
        if field.offset + field.size > len {
            return Err(EepError::FieldOutOfBounds {
                shortcut: field.shortcut.clone(),
                offset: field.offset,
                size: field.size,
                len,
            });
        }
        writes.push((field, raw));
    }

    for (field, raw) in writes {
        let target = match field.kind {
            FieldKind::Status => &mut *status,
            _ => &mut *bits,
        };
        write_bits(target, field.offset, field.size, raw);
    }
    Ok(())
}

fn raw_for_input(field: &FieldDescriptor, input: &FieldInput) -> Result<u64> {
    let out_of_range = |value: String| EepError::ValueOutOfRange {
        shortcut: field.shortcut.clone(),
        value,
        max: field.max_raw(),
    };

    match input {
        FieldInput::Raw(raw) if *raw > field.max_raw() => Err(out_of_range(raw.to_string())),
        FieldInput::Raw(raw) => Ok(*raw),
        FieldInput::Scaled(value) if !value.is_finite() => Err(out_of_range(value.to_string())),
        FieldInput::Scaled(value) => field.unscaled(*value),
        FieldInput::Label(label) => {
            field
                .raw_for_label(label)
                .ok_or_else(|| EepError::UnknownLabel {
                    shortcut: field.shortcut.clone(),
                    label: label.clone(),
                })
        }
        FieldInput::Flag(flag) => Ok(u64::from(*flag)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::{bits_to_bytes, bytes_to_bits};

    const BLOCK: &str = r#"{
        "bytes": 4,
        "fields": [
            { "kind": "value", "shortcut": "HUM", "description": "Humidity",
              "offset": 8, "size": 8, "unit": "%",
              "range": { "min": 0, "max": 250 }, "scale": { "min": 0, "max": 100 } },
            { "kind": "value", "shortcut": "TMP", "description": "Temperature",
              "offset": 16, "size": 8, "unit": "C",
              "range": { "min": 0, "max": 250 }, "scale": { "min": 0, "max": 40 } },
            { "kind": "enum", "shortcut": "TSN", "description": "Sensor",
              "offset": 30, "size": 1,
              "items": [ { "value": 0, "description": "not available" },
                         { "value": 1, "description": "available" } ] },
            { "kind": "enum", "shortcut": "MODE", "description": "Mode",
              "offset": 0, "size": 4,
              "items": [ { "value": 0, "description": "off" } ],
              "range_items": [ { "start": 1, "end": 3, "description": "level {value}" } ] },
            { "kind": "status", "shortcut": "T21", "description": "T21",
              "offset": 2, "size": 1 }
        ]
    }"#;

    fn block() -> DataBlock {
        serde_json::from_str(BLOCK).unwrap()
    }

    fn find<'a>(fields: &'a [DecodedField], shortcut: &str) -> Option<&'a DecodedField> {
        fields.iter().find(|field| field.shortcut == shortcut)
    }

    #[test]
    fn decode_scaled_enum_and_status() {
        let bits = bytes_to_bits(&[0x20, 0x7D, 0xFA, 0x02], 32);
        let status = bytes_to_bits(&[0x20], 8);
        let fields = decode_fields(&block(), &bits, &status);

        let names: Vec<_> = fields.iter().map(|field| field.shortcut.as_str()).collect();
        assert_eq!(names, ["HUM", "TMP", "TSN", "MODE", "T21"]);

        let hum = find(&fields, "HUM").unwrap();
        assert_eq!(hum.raw_value, 125);
        assert_eq!(hum.value, FieldValue::Scaled(50.0));
        assert_eq!(hum.unit.as_deref(), Some("%"));

        let tmp = find(&fields, "TMP").unwrap();
        assert_eq!(tmp.value, FieldValue::Scaled(40.0));

        let tsn = find(&fields, "TSN").unwrap();
        assert_eq!(tsn.raw_value, 1);
        assert_eq!(tsn.value.as_label(), Some("available"));

        let mode = find(&fields, "MODE").unwrap();
        assert_eq!(mode.value.as_label(), Some("level 2"));

        assert_eq!(find(&fields, "T21").unwrap().value.as_flag(), Some(true));
    }

    #[test]
    fn unmapped_enum_value_is_omitted() {
        let bits = bytes_to_bits(&[0xF0, 0, 0, 0], 32);
        let fields = decode_fields(&block(), &bits, &bytes_to_bits(&[0], 8));
        assert!(find(&fields, "MODE").is_none());
        assert!(find(&fields, "HUM").is_some());
    }

    #[test]
    fn fields_beyond_payload_are_omitted() {
        let bits = bytes_to_bits(&[0x00, 0x10], 16);
        let fields = decode_fields(&block(), &bits, &bytes_to_bits(&[0], 8));
        let names: Vec<_> = fields.iter().map(|field| field.shortcut.as_str()).collect();
        assert_eq!(names, ["HUM", "MODE", "T21"]);
    }

    #[test]
    fn encode_then_decode() {
        let block = block();
        let mut bits = vec![false; 32];
        let mut status = vec![false; 8];

        let hum = FieldInput::Scaled(50.0);
        let tsn = FieldInput::from("available");
        let mode = FieldInput::from("level 3");
        let t21 = FieldInput::Flag(true);
        encode_fields(
            &block,
            &mut bits,
            &mut status,
            [("HUM", &hum), ("TSN", &tsn), ("MODE", &mode), ("T21", &t21)],
        )
        .unwrap();

        assert_eq!(bits_to_bytes(&bits), vec![0x30, 0x7D, 0x00, 0x02]);
        assert_eq!(bits_to_bytes(&status), vec![0x20]);

        let fields = decode_fields(&block, &bits, &status);
        assert_eq!(find(&fields, "HUM").unwrap().value, FieldValue::Scaled(50.0));
        assert_eq!(find(&fields, "MODE").unwrap().raw_value, 3);
    }

    #[test]
    fn encode_leaves_unnamed_fields() {
        let block = block();
        let mut bits = bytes_to_bits(&[0x00, 0x00, 0xAA, 0x00], 32);
        let mut status = vec![false; 8];
        let raw = FieldInput::Raw(7);
        encode_fields(&block, &mut bits, &mut status, [("HUM", &raw)]).unwrap();
        assert_eq!(bits_to_bytes(&bits), vec![0x00, 0x07, 0xAA, 0x00]);
    }

    #[test]
    fn encode_rejects_bad_input_without_writing() {
        let block = block();
        let mut bits = vec![false; 32];
        let mut status = vec![false; 8];
        let ok = FieldInput::Raw(1);

        let bad = FieldInput::Raw(0x100);
        let err = encode_fields(&block, &mut bits, &mut status, [("TMP", &ok), ("HUM", &bad)])
            .unwrap_err();
        assert!(matches!(err, EepError::ValueOutOfRange { max: 255, .. }));
        assert!(bits.iter().all(|bit| !bit));

        let err = encode_fields(&block, &mut bits, &mut status, [("NOPE", &ok)]).unwrap_err();
        assert!(matches!(err, EepError::UnknownField(name) if name == "NOPE"));

        let label = FieldInput::from("maybe");
        let err = encode_fields(&block, &mut bits, &mut status, [("TSN", &label)]).unwrap_err();
        assert!(matches!(err, EepError::UnknownLabel { .. }));

        let nan = FieldInput::Scaled(f64::NAN);
        let err = encode_fields(&block, &mut bits, &mut status, [("TMP", &nan)]).unwrap_err();
        assert!(matches!(err, EepError::ValueOutOfRange { .. }));

        let mut short = vec![false; 16];
        let err = encode_fields(&block, &mut short, &mut status, [("TMP", &ok)]).unwrap_err();
        assert!(matches!(err, EepError::FieldOutOfBounds { len: 16, .. }));
    }

    #[test]
    fn encode_with_range_beyond_width_fails() {
        let block: DataBlock = serde_json::from_str(
            r#"{ "bytes": 1, "fields": [
                { "kind": "value", "shortcut": "X", "offset": 0, "size": 8,
                  "range": { "min": 300, "max": 400 }, "scale": { "min": 0, "max": 10 } }
            ] }"#,
        )
        .unwrap();
        let mut bits = vec![false; 8];
        let mut status = vec![false; 8];
        let value = FieldInput::Scaled(5.0);

        let err = encode_fields(&block, &mut bits, &mut status, [("X", &value)]).unwrap_err();
        assert!(matches!(err, EepError::ValueOutOfRange { max: 255, .. }));
        assert!(bits.iter().all(|bit| !bit));
    }

    #[test]
    fn field_input_from_json() {
        let inputs: Vec<FieldInput> =
            serde_json::from_str(r#"[3, 21.5, "on", true]"#).unwrap();
        assert_eq!(
            inputs,
            vec![
                FieldInput::Raw(3),
                FieldInput::Scaled(21.5),
                FieldInput::Label("on".into()),
                FieldInput::Flag(true),
            ]
        );
    }
}
