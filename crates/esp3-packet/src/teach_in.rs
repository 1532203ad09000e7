//! Universal teach-in (UTE) requests and their responses.

use bytes::Bytes;
use esp3_eep::ProfileId;
use esp3_frame::{Frame, RADIO_ERP1};
use serde::Serialize;

use crate::address::Address;
use crate::radio::RadioInfo;
use crate::rorg::{MSC, UTE};

/// Category byte, DB6..DB0, sender and status.
pub const TEACH_IN_LEN: usize = 13;

/// What the requesting device asks for (DB6 bits 5..4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeachInRequest {
    TeachIn,
    Delete,
    NotSpecific,
    Reserved,
}

impl TeachInRequest {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::TeachIn,
            1 => Self::Delete,
            2 => Self::NotSpecific,
            _ => Self::Reserved,
        }
    }
}

/// Outcome reported back to a device that asked to be taught in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeachInResponse {
    NotAccepted = 0,
    TeachInAccepted = 1,
    DeleteAccepted = 2,
    EepNotSupported = 3,
}

impl TeachInResponse {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// A parsed UTE teach-in query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeachInInfo {
    /// Radio attributes of the query. `learn` is false for delete requests
    /// and true otherwise, so deleting a device never binds its profile.
    pub radio: RadioInfo,
    pub unidirectional: bool,
    pub response_expected: bool,
    pub request: TeachInRequest,
    pub channel: u8,
    /// 11-bit manufacturer id.
    pub manufacturer: u16,
    /// Profile the device announces.
    pub eep: ProfileId,
    /// DB5..DB0 as received, echoed in the response.
    #[serde(skip)]
    echo: [u8; 6],
}

impl TeachInInfo {
    /// Parse a UTE query. `radio.learn` is cleared for delete requests.
    pub(crate) fn parse(data: &[u8], mut radio: RadioInfo) -> Option<Self> {
        if data.len() < TEACH_IN_LEN || data[0] != UTE {
            return None;
        }
        let db6 = data[1];
        let request = TeachInRequest::from_bits(db6 >> 4);
        radio.learn = request != TeachInRequest::Delete;

        let manufacturer = (u16::from(data[4] & 0x07) << 8) | u16::from(data[3]);
        let eep_rorg = data[7];
        let rorg = if eep_rorg == MSC {
            ProfileId::msc_rorg(manufacturer)
        } else {
            u32::from(eep_rorg)
        };

        let mut echo = [0u8; 6];
        echo.copy_from_slice(&data[2..8]);

        Some(Self {
            radio,
            unidirectional: db6 & 0x80 == 0,
            response_expected: db6 & 0x40 == 0,
            request,
            channel: data[2],
            manufacturer,
            eep: ProfileId::new(rorg, data[6], data[5]),
            echo,
        })
    }

    /// Build the response telegram, sent from `sender` back to the requester.
    pub fn response(&self, sender: Address, response: TeachInResponse) -> Frame {
        let mut data = Vec::with_capacity(TEACH_IN_LEN);
        data.push(UTE);
        // Bidirectional, response message, command 1.
        data.push(0x80 | (response.code() << 4) | 0x01);
        data.extend_from_slice(&self.echo);
        data.extend_from_slice(sender.as_bytes());
        data.push(0x00);

        let mut optional = Vec::with_capacity(7);
        optional.push(0x03);
        optional.extend_from_slice(self.radio.sender.as_bytes());
        optional.extend_from_slice(&[0xFF, 0x00]);

        tracing::debug!(
            requester = %self.radio.sender,
            ?response,
            "built teach-in response"
        );
        Frame::new(RADIO_ERP1, Bytes::from(data), Bytes::from(optional))
    }
}
