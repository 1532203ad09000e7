//! ESP3 packet type byte values.
//!
//! The packet type occupies the fifth header byte of every frame and tells
//! the receiver how to interpret the data payload.

/// Radio telegram (ERP1).
pub const RADIO_ERP1: u8 = 0x01;

/// Response to a previously sent command.
pub const RESPONSE: u8 = 0x02;

/// Radio subtelegram.
pub const RADIO_SUB_TEL: u8 = 0x03;

/// Event raised by the module.
pub const EVENT: u8 = 0x04;

/// Common command.
pub const COMMON_COMMAND: u8 = 0x05;

/// Smart Ack command.
pub const SMART_ACK_COMMAND: u8 = 0x06;

/// Remote management command.
pub const REMOTE_MAN_COMMAND: u8 = 0x07;

/// Radio message.
pub const RADIO_MESSAGE: u8 = 0x09;

/// Radio telegram (ERP2).
pub const RADIO_ERP2: u8 = 0x0A;

/// Returns a human-readable name for a packet type.
pub fn packet_type_name(packet_type: u8) -> &'static str {
    match packet_type {
        RADIO_ERP1 => "RADIO_ERP1",
        RESPONSE => "RESPONSE",
        RADIO_SUB_TEL => "RADIO_SUB_TEL",
        EVENT => "EVENT",
        COMMON_COMMAND => "COMMON_COMMAND",
        SMART_ACK_COMMAND => "SMART_ACK_COMMAND",
        REMOTE_MAN_COMMAND => "REMOTE_MAN_COMMAND",
        RADIO_MESSAGE => "RADIO_MESSAGE",
        RADIO_ERP2 => "RADIO_ERP2",
        _ => "UNKNOWN",
    }
}
