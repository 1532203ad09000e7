//! Builders for outgoing radio telegrams.

use bytes::BytesMut;
use esp3_eep::bits::{bits_to_bytes, bits_to_integer, bytes_to_bits, write_bits};
use esp3_eep::{EepError, FieldInput, ProfileCatalog, ProfileId};
use esp3_frame::{decode_frame, Frame, RADIO_ERP1};

use crate::address::Address;
use crate::error::{PacketError, Result};
use crate::packet::Packet;
use crate::radio::msc_command_field;
use crate::rorg::{self, BS1, BS4, MSC, RPS, VLD};

/// Optional data of an outgoing radio telegram: one sub-telegram, the
/// destination, maximum signal level and no security.
fn outgoing_optional(destination: Address) -> Vec<u8> {
    let mut optional = Vec::with_capacity(7);
    optional.push(0x03);
    optional.extend_from_slice(destination.as_bytes());
    optional.extend_from_slice(&[0xFF, 0x00]);
    optional
}

fn radio_data(rorg: u8, payload: &[u8], sender: Address, status: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(payload.len() + 6);
    data.push(rorg);
    data.extend_from_slice(payload);
    data.extend_from_slice(sender.as_bytes());
    data.push(status);
    data
}

/// Encode `frame` and decode it again, so a built packet is exactly what a
/// receiver would see.
fn round_trip(frame: &Frame) -> Result<Packet> {
    let mut buf = BytesMut::with_capacity(frame.wire_size());
    frame.encode(&mut buf)?;
    let decoded = decode_frame(&mut buf)?.ok_or(PacketError::Malformed(
        "encoded frame did not decode",
    ))?;
    Ok(Packet::parse(&decoded))
}

fn set_value(values: &mut Vec<(String, FieldInput)>, shortcut: &str, value: FieldInput) {
    values.retain(|(name, _)| name != shortcut);
    values.push((shortcut.to_string(), value));
}

/// Builds an RPS, BS1, BS4 or VLD telegram from named field values.
///
/// ```no_run
/// # use esp3_eep::ProfileRegistry;
/// # use esp3_packet::RadioBuilder;
/// let registry = ProfileRegistry::builtin()?;
/// let packet = RadioBuilder::new(&registry, 0xD2, 0x01, 0x01)
///     .command(1)
///     .sender("01:80:F6:2A".parse()?)
///     .value("IO", "All output channels supported by the device")
///     .value("OV", "Output value 100% or ON")
///     .build()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RadioBuilder<'c> {
    catalog: &'c dyn ProfileCatalog,
    packet_type: u8,
    rorg: u8,
    func: u8,
    type_: u8,
    direction: Option<u8>,
    command: Option<u8>,
    destination: Option<Address>,
    sender: Option<Address>,
    learn: bool,
    values: Vec<(String, FieldInput)>,
}

impl<'c> RadioBuilder<'c> {
    pub fn new(catalog: &'c dyn ProfileCatalog, rorg: u8, func: u8, type_: u8) -> Self {
        Self {
            catalog,
            packet_type: RADIO_ERP1,
            rorg,
            func,
            type_,
            direction: None,
            command: None,
            destination: None,
            sender: None,
            learn: false,
            values: Vec::new(),
        }
    }

    /// Packet type of the telegram. Only radio telegrams can be built.
    pub fn packet_type(mut self, packet_type: u8) -> Self {
        self.packet_type = packet_type;
        self
    }

    pub fn direction(mut self, direction: u8) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Command selecting the data block; also written to the `CMD` field
    /// when the block has one.
    pub fn command(mut self, command: u8) -> Self {
        self.command = Some(command);
        self
    }

    pub fn destination(mut self, destination: Address) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Build a teach-in telegram (BS1/BS4 learn bit cleared).
    pub fn learn(mut self, learn: bool) -> Self {
        self.learn = learn;
        self
    }

    pub fn value(mut self, shortcut: &str, value: impl Into<FieldInput>) -> Self {
        set_value(&mut self.values, shortcut, value.into());
        self
    }

    pub fn build(self) -> Result<Packet> {
        if self.packet_type != RADIO_ERP1 {
            return Err(PacketError::UnsupportedPacketType(self.packet_type));
        }
        if !matches!(self.rorg, RPS | BS1 | BS4 | VLD) {
            return Err(PacketError::UnsupportedCategory(self.rorg));
        }

        let id = ProfileId::new(u32::from(self.rorg), self.func, self.type_);
        let resolved = self
            .catalog
            .find_profile(&id, self.direction, self.command)
            .ok_or(EepError::ProfileNotFound {
                id,
                command: self.command,
            })?;

        let payload_len = match self.rorg {
            BS4 => 4,
            VLD => resolved.block.byte_len(),
            _ => 1,
        };
        let destination = self.destination.unwrap_or_else(|| {
            tracing::warn!("no destination given, sending to broadcast");
            Address::BROADCAST
        });
        let sender = self.sender.unwrap_or_else(|| {
            tracing::warn!(sender = %Address::PLACEHOLDER, "no sender given, using placeholder");
            Address::PLACEHOLDER
        });

        let mut values = self.values;
        if let Some(command) = self.command {
            if resolved.block.has_field("CMD") {
                set_value(&mut values, "CMD", FieldInput::Raw(u64::from(command)));
            }
        }

        let mut bits = vec![false; payload_len * 8];
        let mut status_bits = vec![false; 8];
        resolved.encode(
            &mut bits,
            &mut status_bits,
            values.iter().map(|(name, value)| (name.as_str(), value)),
        )?;

        let mut payload = bits_to_bytes(&bits);
        if rorg::has_learn_bit(self.rorg) && !self.learn {
            if let Some(db0) = payload.last_mut() {
                *db0 |= 0x08;
            }
        }
        let status = bits_to_integer(&status_bits) as u8;

        let frame = Frame::new(
            RADIO_ERP1,
            radio_data(self.rorg, &payload, sender, status),
            outgoing_optional(destination),
        );
        let mut packet = round_trip(&frame)?;
        packet.parse_eep(
            self.catalog,
            self.func,
            self.type_,
            self.direction,
            self.command,
        )?;
        tracing::debug!(profile = %id, %sender, %destination, "radio telegram built");
        Ok(packet)
    }
}

/// Builds a manufacturer-specific (MSC) telegram.
///
/// The payload starts with the 12-bit manufacturer id followed by the
/// command. It is either given as raw bytes or encoded from named values of
/// the manufacturer's profile; bytes no field covers are sent as `0xFF`.
pub struct MscBuilder<'c> {
    manufacturer: u16,
    command: u8,
    sender: Option<Address>,
    destination: Option<Address>,
    status: u8,
    payload: Vec<u8>,
    profile: Option<(&'c dyn ProfileCatalog, u8, u8)>,
    values: Vec<(String, FieldInput)>,
}

impl<'c> MscBuilder<'c> {
    pub fn new(manufacturer: u16, command: u8) -> Self {
        Self {
            manufacturer,
            command,
            sender: None,
            destination: None,
            status: 0x80,
            payload: Vec::new(),
            profile: None,
            values: Vec::new(),
        }
    }

    /// Sender address (required).
    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn destination(mut self, destination: Address) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn status(mut self, status: u8) -> Self {
        self.status = status;
        self
    }

    /// Raw bytes appended after the manufacturer/command header.
    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    /// Encode named values with profile `(0xD1 << 12 | manufacturer, func, type_)`.
    pub fn profile(mut self, catalog: &'c dyn ProfileCatalog, func: u8, type_: u8) -> Self {
        self.profile = Some((catalog, func, type_));
        self
    }

    pub fn value(mut self, shortcut: &str, value: impl Into<FieldInput>) -> Self {
        set_value(&mut self.values, shortcut, value.into());
        self
    }

    pub fn build(self) -> Result<Packet> {
        if self.manufacturer > 0x7FF {
            return Err(PacketError::InvalidManufacturer(self.manufacturer));
        }
        let (offset, width) = msc_command_field(self.manufacturer);
        if u32::from(self.command) >= 1 << width {
            return Err(PacketError::InvalidCommand {
                manufacturer: self.manufacturer,
                command: self.command,
            });
        }
        let sender = self.sender.ok_or(PacketError::MissingSender)?;
        let destination = self.destination.unwrap_or(Address::BROADCAST);
        let header_len = (offset + width) / 8;

        let payload = match self.profile {
            Some((catalog, func, type_)) => {
                let id = ProfileId::new(ProfileId::msc_rorg(self.manufacturer), func, type_);
                let resolved = catalog
                    .find_profile(&id, None, Some(self.command))
                    .ok_or(EepError::ProfileNotFound {
                        id,
                        command: Some(self.command),
                    })?;
                let len = resolved.block.byte_len().max(header_len);
                let mut bits = bytes_to_bits(&vec![0xFF; len], len * 8);
                self.write_header(&mut bits, offset, width);
                let mut status_bits = bytes_to_bits(&[self.status], 8);
                resolved.encode(
                    &mut bits,
                    &mut status_bits,
                    self.values.iter().map(|(name, value)| (name.as_str(), value)),
                )?;
                bits_to_bytes(&bits)
            }
            None => {
                let mut bits = vec![false; header_len * 8];
                self.write_header(&mut bits, offset, width);
                let mut payload = bits_to_bytes(&bits);
                payload.extend_from_slice(&self.payload);
                payload
            }
        };

        let frame = Frame::new(
            RADIO_ERP1,
            radio_data(MSC, &payload, sender, self.status),
            outgoing_optional(destination),
        );
        let mut packet = round_trip(&frame)?;
        if let Some((catalog, func, type_)) = self.profile {
            packet.parse_eep(catalog, func, type_, None, Some(self.command))?;
        }
        tracing::debug!(
            manufacturer = self.manufacturer,
            command = self.command,
            %sender,
            "manufacturer telegram built"
        );
        Ok(packet)
    }

    fn write_header(&self, bits: &mut [bool], offset: usize, width: usize) {
        write_bits(bits, 0, 12, u64::from(self.manufacturer));
        if offset > 12 {
            write_bits(bits, 12, offset - 12, 0);
        }
        write_bits(bits, offset, width, u64::from(self.command));
    }
}
