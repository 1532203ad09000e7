use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PacketError;

/// 32-bit radio device address, big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 4]);

impl Address {
    /// Destination used for broadcast telegrams.
    pub const BROADCAST: Address = Address([0xFF; 4]);

    /// Placeholder sender used by builders when none is given.
    pub const PLACEHOLDER: Address = Address([0xDE, 0xAD, 0xBE, 0xEF]);

    /// Address from the first four bytes of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl From<[u8; 4]> for Address {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl From<u32> for Address {
    fn from(value: u32) -> Self {
        Self(value.to_be_bytes())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}")
    }
}

/// Accepts `DE:AD:BE:EF`, `DE-AD-BE-EF`, `DEADBEEF` and `0xDEADBEEF`.
impl FromStr for Address {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits: String = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed)
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();
        if digits.len() != 8 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PacketError::InvalidAddress(s.to_string()));
        }
        u32::from_str_radix(&digits, 16)
            .map(Self::from)
            .map_err(|_| PacketError::InvalidAddress(s.to_string()))
    }
}

impl TryFrom<String> for Address {
    type Error = PacketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}
