//! Radio telegram categories (RORG), the first data byte of a radio packet.

/// Repeated switch communication.
pub const RPS: u8 = 0xF6;
/// 1-byte communication.
pub const BS1: u8 = 0xD5;
/// 4-byte communication.
pub const BS4: u8 = 0xA5;
/// Variable length data.
pub const VLD: u8 = 0xD2;
/// Manufacturer specific communication.
pub const MSC: u8 = 0xD1;
/// Addressing destination telegram.
pub const ADT: u8 = 0xA6;
pub const SM_LRN_REQ: u8 = 0xC6;
pub const SM_LRN_ANS: u8 = 0xC7;
pub const SM_REC: u8 = 0xA7;
pub const SYS_EX: u8 = 0xC5;
pub const SEC: u8 = 0x30;
pub const SEC_ENCAPS: u8 = 0x31;
/// Universal teach-in, bidirectional variant.
pub const UTE: u8 = 0xD4;
/// Standard chained data telegram.
pub const CHAINED: u8 = 0xC8;
/// Chained telegram as emitted by some manufacturer devices (length field
/// in decimal digits, no category byte in the reassembled payload).
pub const CHAINED_PROPRIETARY: u8 = 0x40;
pub const UNDEFINED: u8 = 0x00;

/// Human-readable RORG name.
pub fn rorg_name(rorg: u8) -> &'static str {
    match rorg {
        RPS => "RPS",
        BS1 => "BS1",
        BS4 => "BS4",
        VLD => "VLD",
        MSC => "MSC",
        ADT => "ADT",
        SM_LRN_REQ => "SM_LRN_REQ",
        SM_LRN_ANS => "SM_LRN_ANS",
        SM_REC => "SM_REC",
        SYS_EX => "SYS_EX",
        SEC => "SEC",
        SEC_ENCAPS => "SEC_ENCAPS",
        UTE => "UTE",
        CHAINED => "CHAINED",
        CHAINED_PROPRIETARY => "CHAINED_PROPRIETARY",
        UNDEFINED => "UNDEFINED",
        _ => "UNKNOWN",
    }
}

/// Categories whose status byte carries a repeater count in its low nibble.
pub(crate) fn has_repeater_count(rorg: u8) -> bool {
    matches!(rorg, RPS | BS1 | BS4)
}

/// Categories with a learn bit (DB0.3).
pub(crate) fn has_learn_bit(rorg: u8) -> bool {
    matches!(rorg, BS1 | BS4)
}
