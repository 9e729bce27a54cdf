// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::fmt;

/// Errors raised while turning a `Message` into bytes.
///
/// Encoding a well-formed `Message` should never fail in practice; this
/// exists mainly to surface lengths that overflow the protocol's header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EncodeError {
    /// Total encoded length does not fit in the protocol's 16-bit length field.
    TooLong(usize),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::TooLong(len) => write!(f, "encoded message is too long: {len} bytes"),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Errors raised while turning a raw UDP payload into a `Message`.
///
/// Every variant here is a structural error; any of these is dropped
/// silently by the dispatcher after being logged.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DecodeError {
    /// Datagram is shorter than the minimum length field.
    Empty,

    /// The length header's first byte is 0x01 but fewer than two bytes follow it.
    TruncatedLengthHeader,

    /// Length field value does not equal the actual datagram length.
    LengthMismatch { declared: usize, actual: usize },

    /// No message-type byte is present after the length header.
    MissingMessageType,

    /// A fixed-size field (duration, topic-id, msg-id, return-code, protocol-id)
    /// is missing or truncated.
    TruncatedField(&'static str),

    /// `Connect::protocol_id` was not `0x01`.
    InvalidProtocolId(u8),

    /// A topic-name or client-id field contains invalid UTF-8.
    InvalidUtf8(&'static str),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "datagram is empty"),
            Self::TruncatedLengthHeader => write!(f, "truncated 3-byte length header"),
            Self::LengthMismatch { declared, actual } => write!(
                f,
                "length field declares {declared} bytes but datagram is {actual} bytes"
            ),
            Self::MissingMessageType => write!(f, "missing message-type byte"),
            Self::TruncatedField(name) => write!(f, "truncated field: {name}"),
            Self::InvalidProtocolId(id) => write!(f, "invalid protocol id 0x{id:02x}"),
            Self::InvalidUtf8(name) => write!(f, "invalid UTF-8 in field: {name}"),
        }
    }
}

impl std::error::Error for DecodeError {}
