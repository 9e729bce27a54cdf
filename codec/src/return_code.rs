// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

/// Return code carried by `Connack`, `Regack` and `Puback`.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ReturnCode {
    #[default]
    Accepted = 0,
    Congestion = 1,
    InvalidTopic = 2,
    NotSupported = 3,
}

impl From<ReturnCode> for u8 {
    fn from(code: ReturnCode) -> Self {
        code as u8
    }
}

impl From<u8> for ReturnCode {
    /// Any value outside the known range is treated as `NotSupported` rather
    /// than failing decode; an otherwise well-formed acknowledgement with an
    /// exotic return code is still informative to the caller.
    fn from(byte: u8) -> Self {
        match byte {
            0 => Self::Accepted,
            1 => Self::Congestion,
            2 => Self::InvalidTopic,
            _ => Self::NotSupported,
        }
    }
}
