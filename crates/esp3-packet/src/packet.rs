use bytes::{Bytes, BytesMut};
use esp3_eep::bits::bytes_to_bits;
use esp3_eep::{DecodedField, EepError, ProfileCatalog, ProfileId};
use esp3_frame::{Frame, EVENT, RADIO_ERP1, RESPONSE};
use serde::Serialize;

use crate::address::Address;
use crate::chain::{ChainFraming, ChainFragment};
use crate::error::Result;
use crate::radio::{self, RadioInfo};
use crate::rorg::{self, CHAINED, CHAINED_PROPRIETARY, MSC, UTE};
use crate::teach_in::TeachInInfo;

/// Which packet variant a frame maps to, decided by packet type and, for
/// radio telegrams, the category byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketClass {
    Generic,
    Radio,
    Msc,
    TeachIn,
    Chained,
    Response,
    Event,
}

/// Map a packet type and the first data byte to a packet class.
pub fn classify(packet_type: u8, first_byte: Option<u8>) -> PacketClass {
    match (packet_type, first_byte) {
        (RADIO_ERP1, Some(UTE)) => PacketClass::TeachIn,
        (RADIO_ERP1, Some(CHAINED | CHAINED_PROPRIETARY)) => PacketClass::Chained,
        (RADIO_ERP1, Some(MSC)) => PacketClass::Msc,
        (RADIO_ERP1, Some(_)) => PacketClass::Radio,
        (RESPONSE, _) => PacketClass::Response,
        (EVENT, _) => PacketClass::Event,
        _ => PacketClass::Generic,
    }
}

/// Name of a response return code.
pub fn return_code_name(code: u8) -> &'static str {
    match code {
        0x00 => "OK",
        0x01 => "ERROR",
        0x02 => "NOT_SUPPORTED",
        0x03 => "WRONG_PARAM",
        0x04 => "OPERATION_DENIED",
        _ => "UNKNOWN",
    }
}

/// Reply of the radio module to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseInfo {
    pub return_code: u8,
    /// Response data after the return code.
    pub data: Bytes,
}

impl ResponseInfo {
    pub fn name(&self) -> &'static str {
        return_code_name(self.return_code)
    }
}

/// Unsolicited notification from the radio module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    pub code: u8,
    /// Event data after the event code.
    pub data: Bytes,
}

/// A chain fragment, or the message reassembled from a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainedInfo {
    /// Radio attributes. For a reassembled message these come from the
    /// reassembled telegram.
    pub radio: RadioInfo,
    pub framing: ChainFraming,
    pub sequence: u8,
    /// Index of the fragment (the last one for a reassembled message).
    pub index: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_len: Option<usize>,
    pub fragments: usize,
    pub complete: bool,
}

/// Variant-specific attributes of a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketKind {
    /// Unknown packet type, or a telegram too short for its variant.
    Generic,
    Radio(RadioInfo),
    /// Manufacturer-specific telegram.
    Msc(RadioInfo),
    TeachIn(TeachInInfo),
    Response(ResponseInfo),
    Event(EventInfo),
    Chained(ChainedInfo),
}

impl PacketKind {
    pub fn name(&self) -> &'static str {
        match self {
            PacketKind::Generic => "generic",
            PacketKind::Radio(_) => "radio",
            PacketKind::Msc(_) => "msc",
            PacketKind::TeachIn(_) => "teach_in",
            PacketKind::Response(_) => "response",
            PacketKind::Event(_) => "event",
            PacketKind::Chained(_) => "chained",
        }
    }
}

/// A parsed ESP3 packet.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub packet_type: u8,
    /// Category byte of a radio telegram, [`rorg::UNDEFINED`] otherwise.
    pub rorg: u8,
    pub data: Bytes,
    pub optional: Bytes,
    /// Last data byte of a radio telegram.
    pub status: u8,
    pub repeater_count: u8,
    /// Fields decoded with [`Packet::parse_eep`].
    pub fields: Vec<DecodedField>,
    /// Profile the fields were decoded with.
    pub profile: Option<ProfileId>,
    pub kind: PacketKind,
}

impl Packet {
    /// Parse a verified frame. Never fails: a telegram too short for its
    /// variant becomes [`PacketKind::Generic`].
    pub fn parse(frame: &Frame) -> Self {
        let class = classify(frame.packet_type, frame.data.first().copied());
        let is_radio = frame.packet_type == RADIO_ERP1;
        let rorg = if is_radio {
            frame.data.first().copied().unwrap_or(rorg::UNDEFINED)
        } else {
            rorg::UNDEFINED
        };
        let (status, repeater_count) = if is_radio {
            radio::status(rorg, &frame.data)
        } else {
            (0, 0)
        };

        let radio = || radio::parse(rorg, &frame.data, &frame.optional);
        let kind = match class {
            PacketClass::Generic => Some(PacketKind::Generic),
            PacketClass::Radio => radio().map(PacketKind::Radio),
            PacketClass::Msc => radio().map(PacketKind::Msc),
            PacketClass::TeachIn => radio()
                .and_then(|info| TeachInInfo::parse(&frame.data, info))
                .map(PacketKind::TeachIn),
            PacketClass::Chained => ChainFragment::parse(&frame.data, &frame.optional)
                .zip(radio())
                .map(|(fragment, info)| {
                    PacketKind::Chained(ChainedInfo {
                        radio: info,
                        framing: fragment.framing,
                        sequence: fragment.sequence,
                        index: fragment.index,
                        declared_len: fragment.declared_len,
                        fragments: 1,
                        complete: false,
                    })
                }),
            PacketClass::Response => frame.data.first().map(|code| {
                PacketKind::Response(ResponseInfo {
                    return_code: *code,
                    data: frame.data.slice(1..),
                })
            }),
            PacketClass::Event => frame.data.first().map(|code| {
                PacketKind::Event(EventInfo {
                    code: *code,
                    data: frame.data.slice(1..),
                })
            }),
        };
        let kind = kind.unwrap_or_else(|| {
            tracing::debug!(
                packet_type = frame.packet_type,
                ?class,
                len = frame.data.len(),
                "telegram too short for its class, kept as generic"
            );
            PacketKind::Generic
        });

        Self {
            packet_type: frame.packet_type,
            rorg,
            data: frame.data.clone(),
            optional: frame.optional.clone(),
            status,
            repeater_count,
            fields: Vec::new(),
            profile: None,
            kind,
        }
    }

    /// Radio attributes, for every radio variant.
    pub fn radio(&self) -> Option<&RadioInfo> {
        match &self.kind {
            PacketKind::Radio(info) | PacketKind::Msc(info) => Some(info),
            PacketKind::TeachIn(info) => Some(&info.radio),
            PacketKind::Chained(info) => Some(&info.radio),
            _ => None,
        }
    }

    pub fn sender(&self) -> Option<Address> {
        self.radio().map(|info| info.sender)
    }

    pub fn destination(&self) -> Option<Address> {
        self.radio().map(|info| info.destination)
    }

    pub fn dbm(&self) -> Option<i16> {
        self.radio().map(|info| info.dbm)
    }

    /// True for teach-in telegrams.
    pub fn learn(&self) -> bool {
        self.radio().is_some_and(|info| info.learn)
    }

    /// VLD or MSC command.
    pub fn command(&self) -> Option<u8> {
        self.radio().and_then(|info| info.command)
    }

    pub fn teach_in(&self) -> Option<&TeachInInfo> {
        match &self.kind {
            PacketKind::TeachIn(info) => Some(info),
            _ => None,
        }
    }

    /// True for a chain fragment that is not yet a complete message.
    pub fn is_chain_fragment(&self) -> bool {
        matches!(&self.kind, PacketKind::Chained(info) if !info.complete)
    }

    /// Payload bytes of a radio telegram (between category byte and sender).
    pub fn payload(&self) -> &[u8] {
        if self.radio().is_none() {
            return &[];
        }
        radio::payload(&self.data)
    }

    /// Payload as bits, most significant bit of the first byte first.
    pub fn bit_data(&self) -> Vec<bool> {
        let payload = self.payload();
        bytes_to_bits(payload, payload.len() * 8)
    }

    /// Status byte as 8 bits.
    pub fn bit_status(&self) -> Vec<bool> {
        bytes_to_bits(&[self.status], 8)
    }

    /// Catalog rorg: the category byte, or `(0xD1 << 12) | manufacturer`
    /// for manufacturer-specific telegrams.
    pub fn catalog_rorg(&self) -> u32 {
        match self.radio().and_then(|info| info.manufacturer) {
            Some(manufacturer) if self.rorg == MSC => ProfileId::msc_rorg(manufacturer),
            _ => u32::from(self.rorg),
        }
    }

    /// Decoded field by shortcut.
    pub fn field(&self, shortcut: &str) -> Option<&DecodedField> {
        self.fields.iter().find(|field| field.shortcut == shortcut)
    }

    /// Decode the payload with profile `(catalog rorg, func, type_)`.
    ///
    /// When `command` is `None` the command is taken from the profile's
    /// selector or, failing that, from the telegram itself.
    pub fn parse_eep<C>(
        &mut self,
        catalog: &C,
        func: u8,
        type_: u8,
        direction: Option<u8>,
        command: Option<u8>,
    ) -> Result<&[DecodedField]>
    where
        C: ProfileCatalog + ?Sized,
    {
        let id = ProfileId::new(self.catalog_rorg(), func, type_);
        let bits = self.bit_data();
        let command = command
            .or_else(|| catalog.profile(&id).and_then(|profile| profile.command_of(&bits)))
            .or_else(|| self.command());

        let resolved = catalog
            .find_profile(&id, direction, command)
            .ok_or(EepError::ProfileNotFound { id, command })?;
        self.fields = resolved.decode(&bits, &self.bit_status());
        self.profile = Some(id);
        tracing::trace!(profile = %id, fields = self.fields.len(), "payload decoded");
        Ok(&self.fields)
    }

    /// The frame this packet was parsed from.
    pub fn to_frame(&self) -> Frame {
        Frame::new(self.packet_type, self.data.clone(), self.optional.clone())
    }

    /// Wire bytes of this packet.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::new();
        self.to_frame().encode(&mut buf)?;
        Ok(buf.to_vec())
    }
}

impl From<&Frame> for Packet {
    fn from(frame: &Frame) -> Self {
        Self::parse(frame)
    }
}

#[cfg(test)]
mod tests {
    use esp3_eep::ProfileRegistry;

    use super::*;

    const OPTIONAL: [u8; 7] = [0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x2D, 0x00];

    fn radio_frame(data: &[u8]) -> Frame {
        Frame::new(RADIO_ERP1, data.to_vec(), OPTIONAL.to_vec())
    }

    #[test]
    fn classify_by_type_and_rorg() {
        assert_eq!(classify(RADIO_ERP1, Some(0xF6)), PacketClass::Radio);
        assert_eq!(classify(RADIO_ERP1, Some(0xD1)), PacketClass::Msc);
        assert_eq!(classify(RADIO_ERP1, Some(0xD4)), PacketClass::TeachIn);
        assert_eq!(classify(RADIO_ERP1, Some(0xC8)), PacketClass::Chained);
        assert_eq!(classify(RADIO_ERP1, Some(0x40)), PacketClass::Chained);
        assert_eq!(classify(RADIO_ERP1, None), PacketClass::Generic);
        assert_eq!(classify(RESPONSE, Some(0x00)), PacketClass::Response);
        assert_eq!(classify(EVENT, None), PacketClass::Event);
        assert_eq!(classify(0x05, Some(0x03)), PacketClass::Generic);
    }

    #[test]
    fn parse_rocker_telegram() {
        let packet = Packet::parse(&radio_frame(&[0xF6, 0x50, 0xFE, 0xFE, 0x8A, 0x01, 0x31]));
        assert_eq!(packet.kind.name(), "radio");
        assert_eq!(packet.rorg, 0xF6);
        assert_eq!(packet.status, 0x31);
        assert_eq!(packet.repeater_count, 1);
        assert_eq!(packet.sender(), Some(Address([0xFE, 0xFE, 0x8A, 0x01])));
        assert_eq!(packet.dbm(), Some(-45));
        assert_eq!(packet.payload(), &[0x50]);
    }

    #[test]
    fn parse_eep_decodes_fields() {
        let registry = ProfileRegistry::builtin().unwrap();
        let mut packet =
            Packet::parse(&radio_frame(&[0xA5, 0x00, 0x00, 0x80, 0x08, 0x01, 0x80, 0xF6, 0x2A, 0x00]));
        assert!(!packet.learn());

        let fields = packet.parse_eep(&registry, 0x02, 0x05, None, None).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].shortcut, "TMP");
        assert_eq!(packet.profile, Some(ProfileId::new(0xA5, 0x02, 0x05)));
        assert!(packet.field("TMP").is_some());

        let err = packet.parse_eep(&registry, 0x7F, 0x7F, None, None).unwrap_err();
        assert!(matches!(err, crate::PacketError::Eep(EepError::ProfileNotFound { .. })));
    }

    #[test]
    fn vld_command_selects_block() {
        let registry = ProfileRegistry::builtin().unwrap();
        let mut packet =
            Packet::parse(&radio_frame(&[0xD2, 0x04, 0x60, 0x80, 0x01, 0x80, 0xF6, 0x2A, 0x00]));
        assert_eq!(packet.command(), Some(4));
        packet.parse_eep(&registry, 0x01, 0x01, None, None).unwrap();
        assert!(packet.field("PF").is_some());
    }

    #[test]
    fn response_and_event() {
        let packet = Packet::parse(&Frame::new(RESPONSE, vec![0x02, 0xAA], Vec::new()));
        let PacketKind::Response(info) = &packet.kind else {
            panic!("expected response");
        };
        assert_eq!(info.name(), "NOT_SUPPORTED");
        assert_eq!(info.data.as_ref(), &[0xAA]);
        assert_eq!(packet.rorg, rorg::UNDEFINED);
        assert!(packet.sender().is_none());

        let packet = Packet::parse(&Frame::new(EVENT, vec![0x04, 0x01], Vec::new()));
        assert!(matches!(&packet.kind, PacketKind::Event(EventInfo { code: 0x04, .. })));
    }

    #[test]
    fn short_telegrams_become_generic() {
        let packet = Packet::parse(&radio_frame(&[0xF6, 0x50]));
        assert_eq!(packet.kind, PacketKind::Generic);
        assert!(packet.payload().is_empty());

        let packet = Packet::parse(&Frame::new(RESPONSE, Vec::new(), Vec::new()));
        assert_eq!(packet.kind, PacketKind::Generic);
    }

    #[test]
    fn chain_fragment_parsed_statelessly() {
        let data = ::hex::decode("40400011D10790010200042058A580").unwrap();
        let packet = Packet::parse(&radio_frame(&data));
        assert!(packet.is_chain_fragment());
        let PacketKind::Chained(info) = &packet.kind else {
            panic!("expected chained");
        };
        assert_eq!(info.sequence, 4);
        assert_eq!(info.declared_len, Some(17));
    }

    #[test]
    fn to_bytes_reproduces_frame() {
        let frame = radio_frame(&[0xF6, 0x50, 0xFE, 0xFE, 0x8A, 0x01, 0x30]);
        let packet = Packet::parse(&frame);
        assert_eq!(packet.to_frame(), frame);
        assert_eq!(packet.to_bytes().unwrap(), frame.to_bytes().unwrap());
    }
}
