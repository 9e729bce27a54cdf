// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use byteorder::{BigEndian, ByteOrder};

use crate::error::{DecodeError, EncodeError};

/// MQTT-SN message-type byte. Only the types this gateway handles get a
/// named variant; everything else is `Unknown`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MsgType {
    Connect,
    Connack,
    Register,
    Regack,
    Publish,
    Puback,
    Pingreq,
    Pingresp,
    Disconnect,
    Unknown(u8),
}

impl From<u8> for MsgType {
    fn from(byte: u8) -> Self {
        match byte {
            0x04 => Self::Connect,
            0x05 => Self::Connack,
            0x0A => Self::Register,
            0x0B => Self::Regack,
            0x0C => Self::Publish,
            0x0D => Self::Puback,
            0x16 => Self::Pingreq,
            0x17 => Self::Pingresp,
            0x18 => Self::Disconnect,
            other => Self::Unknown(other),
        }
    }
}

impl From<MsgType> for u8 {
    fn from(msg_type: MsgType) -> Self {
        match msg_type {
            MsgType::Connect => 0x04,
            MsgType::Connack => 0x05,
            MsgType::Register => 0x0A,
            MsgType::Regack => 0x0B,
            MsgType::Publish => 0x0C,
            MsgType::Puback => 0x0D,
            MsgType::Pingreq => 0x16,
            MsgType::Pingresp => 0x17,
            MsgType::Disconnect => 0x18,
            MsgType::Unknown(byte) => byte,
        }
    }
}

/// Result of parsing the leading length field: how many bytes the length
/// field itself occupies, and the total declared datagram length (itself
/// included).
pub struct LengthHeader {
    pub header_len: usize,
    pub total_len: usize,
}

/// Parse the length header at the start of `buf`.
///
/// # Errors
/// Returns `DecodeError::Empty` or `DecodeError::TruncatedLengthHeader` if
/// `buf` is too short to hold the declared header shape.
pub fn decode_length_header(buf: &[u8]) -> Result<LengthHeader, DecodeError> {
    let first = *buf.first().ok_or(DecodeError::Empty)?;
    if first >= 2 {
        Ok(LengthHeader {
            header_len: 1,
            total_len: first as usize,
        })
    } else if first == 0x01 {
        if buf.len() < 3 {
            return Err(DecodeError::TruncatedLengthHeader);
        }
        let total_len = BigEndian::read_u16(&buf[1..3]) as usize;
        Ok(LengthHeader {
            header_len: 3,
            total_len,
        })
    } else {
        Err(DecodeError::TruncatedLengthHeader)
    }
}

/// Append a length header for a message whose total encoded length
/// (including the header) is `total_len`.
///
/// # Errors
/// Returns `EncodeError::TooLong` if `total_len` does not fit in a `u16`.
pub fn encode_length_header(total_len: usize, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    if total_len < 256 {
        // Safe: total_len < 256 by definition of the `if`, so any value
        // here that is still < 2 can only arise from an empty-message bug,
        // not an overflow; callers always add at least a type byte.
        out.push(total_len as u8);
    } else if total_len <= u16::MAX as usize {
        out.push(0x01);
        out.extend_from_slice(&(total_len as u16).to_be_bytes());
    } else {
        return Err(EncodeError::TooLong(total_len));
    }
    Ok(())
}
