// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Byte-exact codec for the subset of MQTT-SN this gateway speaks:
//! CONNECT/CONNACK, REGISTER/REGACK, PUBLISH/PUBACK, PINGREQ/PINGRESP and
//! DISCONNECT. Pure functions only: parsing and serialization never touch
//! I/O or hold state across calls.

mod error;
mod flags;
mod header;
mod message;
mod return_code;

pub use error::{DecodeError, EncodeError};
pub use flags::{Flags, TopicType};
pub use header::MsgType;
pub use message::{Message, MsgId, TopicId};
pub use return_code::ReturnCode;
