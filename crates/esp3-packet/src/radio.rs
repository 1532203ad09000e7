use esp3_eep::bits::{bytes_to_bits, read_bits};
use esp3_eep::ProfileId;
use serde::Serialize;

use crate::address::Address;
use crate::rorg::{self, BS1, BS4, MSC, VLD};

/// Shortest radio telegram: category byte, sender (4) and status.
pub const MIN_RADIO_LEN: usize = 6;

/// Manufacturer whose MSC telegrams carry a 4-bit command right after the
/// manufacturer id. Every other manufacturer uses a full byte at bit 16.
pub const MANUFACTURER_VENTILAIRSEC: u16 = 0x079;

/// Attributes shared by every radio telegram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadioInfo {
    pub sender: Address,
    pub destination: Address,
    /// Received signal strength in dBm (0 when the optional data is absent).
    pub dbm: i16,
    /// True for teach-in telegrams. Only BS1/BS4 carry a learn bit; every
    /// other category reports true.
    pub learn: bool,
    /// A BS4 teach-in that announces its profile.
    pub contains_eep: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub func: Option<u8>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<u16>,
    /// VLD or MSC command derived from the payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<u8>,
}

impl RadioInfo {
    /// Profile announced by a BS4 teach-in telegram.
    pub fn announced_profile(&self) -> Option<ProfileId> {
        match (self.contains_eep, self.func, self.type_) {
            (true, Some(func), Some(type_)) => Some(ProfileId::new(u32::from(BS4), func, type_)),
            _ => None,
        }
    }
}

/// Bit position and width of the command inside an MSC payload.
pub fn msc_command_field(manufacturer: u16) -> (usize, usize) {
    if manufacturer == MANUFACTURER_VENTILAIRSEC {
        (12, 4)
    } else {
        (16, 8)
    }
}

/// Payload bytes between the category byte and the sender address.
pub(crate) fn payload(data: &[u8]) -> &[u8] {
    if data.len() < MIN_RADIO_LEN {
        return &[];
    }
    &data[1..data.len() - 5]
}

/// Status byte (last data byte) and the repeater count it carries.
pub(crate) fn status(rorg: u8, data: &[u8]) -> (u8, u8) {
    let status = data.last().copied().unwrap_or(0);
    let repeater_count = if rorg::has_repeater_count(rorg) {
        status & 0x0F
    } else {
        0
    };
    (status, repeater_count)
}

/// Parse the radio attributes of `data`/`optional`. Returns `None` when the
/// telegram is too short to hold a sender address.
pub(crate) fn parse(rorg: u8, data: &[u8], optional: &[u8]) -> Option<RadioInfo> {
    if data.len() < MIN_RADIO_LEN {
        return None;
    }
    let len = data.len();
    let sender = Address::from_slice(&data[len - 5..len - 1])?;
    let destination = optional
        .get(1..5)
        .and_then(Address::from_slice)
        .unwrap_or(Address::BROADCAST);
    let dbm = optional.get(5).map_or(0, |level| -i16::from(*level));

    let mut info = RadioInfo {
        sender,
        destination,
        dbm,
        learn: true,
        contains_eep: false,
        func: None,
        type_: None,
        manufacturer: None,
        command: None,
    };

    let payload = payload(data);
    match rorg {
        BS1 | BS4 => {
            if let Some(db0) = payload.last() {
                info.learn = db0 & 0x08 == 0;
                if rorg == BS4 && info.learn && payload.len() == 4 && db0 & 0x80 != 0 {
                    let bits = bytes_to_bits(payload, 32);
                    info.contains_eep = true;
                    info.func = read_bits(&bits, 0, 6).map(|v| v as u8);
                    info.type_ = read_bits(&bits, 6, 7).map(|v| v as u8);
                    info.manufacturer = read_bits(&bits, 13, 11).map(|v| v as u16);
                }
            }
        }
        // CMD occupies bits 4..8 of the first data byte in every VLD profile
        // (D2-01-xx and its relatives), not the high nibble.
        VLD => info.command = payload.first().map(|byte| byte & 0x0F),
        MSC => {
            let bits = bytes_to_bits(payload, payload.len() * 8);
            if let Some(manufacturer) = read_bits(&bits, 0, 12).map(|v| v as u16) {
                let (offset, width) = msc_command_field(manufacturer);
                info.manufacturer = Some(manufacturer);
                info.command = read_bits(&bits, offset, width).map(|v| v as u8);
            }
        }
        _ => {}
    }
    Some(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rorg::RPS;

    const OPTIONAL: [u8; 7] = [0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x2D, 0x00];

    #[test]
    fn rocker_attributes() {
        let data = [0xF6, 0x50, 0xFE, 0xFE, 0x8A, 0x01, 0x30];
        let info = parse(RPS, &data, &OPTIONAL).unwrap();
        assert_eq!(info.sender, Address([0xFE, 0xFE, 0x8A, 0x01]));
        assert!(info.destination.is_broadcast());
        assert_eq!(info.dbm, -45);
        assert!(info.learn);
        assert_eq!(status(RPS, &data), (0x30, 0));
    }

    #[test]
    fn bs4_learn_bit_and_announced_profile() {
        // func 0x02, type 0x05, manufacturer 0x7FF, LRN type bit set, learn
        let data = [0xA5, 0x08, 0x2F, 0xFF, 0x80, 0x01, 0x80, 0xF6, 0x2A, 0x00];
        let info = parse(BS4, &data, &[]).unwrap();
        assert!(info.learn);
        assert!(info.contains_eep);
        assert_eq!(info.func, Some(0x02));
        assert_eq!(info.type_, Some(0x05));
        assert_eq!(info.manufacturer, Some(0x7FF));
        assert_eq!(info.announced_profile(), Some(ProfileId::new(0xA5, 0x02, 0x05)));
        assert_eq!(info.dbm, 0);

        let data = [0xA5, 0x00, 0x00, 0x55, 0x08, 0x01, 0x80, 0xF6, 0x2A, 0x00];
        let info = parse(BS4, &data, &[]).unwrap();
        assert!(!info.learn);
        assert!(!info.contains_eep);
    }

    #[test]
    fn bs1_learn_bit() {
        let data = [0xD5, 0x09, 0x01, 0x80, 0xF6, 0x2A, 0x00];
        assert!(!parse(BS1, &data, &[]).unwrap().learn);
        let data = [0xD5, 0x00, 0x01, 0x80, 0xF6, 0x2A, 0x00];
        assert!(parse(BS1, &data, &[]).unwrap().learn);
    }

    #[test]
    fn msc_manufacturer_and_command() {
        let data = hex("D10791005A000403042058A500");
        let info = parse(MSC, &data, &[]).unwrap();
        assert_eq!(info.manufacturer, Some(MANUFACTURER_VENTILAIRSEC));
        assert_eq!(info.command, Some(1));

        // Other manufacturers: command is the third payload byte.
        let data = [0xD1, 0x00, 0x20, 0x07, 0x01, 0x02, 0x03, 0x04, 0x00];
        let info = parse(MSC, &data, &[]).unwrap();
        assert_eq!(info.manufacturer, Some(0x002));
        assert_eq!(info.command, Some(0x07));
    }

    #[test]
    fn vld_command_nibble() {
        let data = [0xD2, 0x64, 0x60, 0x80, 0x01, 0x02, 0x03, 0x04, 0x00];
        assert_eq!(parse(VLD, &data, &[]).unwrap().command, Some(4));
    }

    #[test]
    fn short_telegram_has_no_radio_attributes() {
        assert!(parse(RPS, &[0xF6, 0x01, 0x02], &OPTIONAL).is_none());
        assert!(payload(&[0xF6]).is_empty());
    }

    fn hex(s: &str) -> Vec<u8> {
        ::hex::decode(s).unwrap()
    }
}
