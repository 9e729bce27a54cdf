// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use byteorder::{BigEndian, ByteOrder};

use crate::error::{DecodeError, EncodeError};
use crate::flags::Flags;
use crate::header::{decode_length_header, encode_length_header, MsgType};
use crate::return_code::ReturnCode;

const PROTOCOL_ID: u8 = 0x01;

/// Message-id, an opaque two-byte correlator chosen by the client and
/// echoed verbatim in the acknowledgement. Never interpreted by the
/// gateway.
pub type MsgId = u16;

/// One-based alias for a topic name, 1..=65535. `None` on the wire is
/// `0x0000`, meaning "unassigned".
pub type TopicId = Option<u16>;

/// A decoded MQTT-SN message. Every arm that this gateway handles is
/// named; all other MQTT-SN message types fold into `Unknown` and are
/// dropped by the dispatcher without a reply.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Message {
    Connect {
        flags: Flags,
        duration: u16,
        client_id: Vec<u8>,
    },
    Connack {
        return_code: ReturnCode,
    },
    Register {
        topic_id: TopicId,
        msg_id: MsgId,
        topic_name: String,
    },
    Regack {
        topic_id: TopicId,
        msg_id: MsgId,
        return_code: ReturnCode,
    },
    Publish {
        flags: Flags,
        topic_id: u16,
        msg_id: MsgId,
        data: Vec<u8>,
    },
    Puback {
        topic_id: u16,
        msg_id: MsgId,
        return_code: ReturnCode,
    },
    Pingreq {
        client_id: Option<Vec<u8>>,
    },
    Pingresp,
    Disconnect {
        duration: Option<u16>,
    },
    /// Any other recognised-or-not MQTT-SN message type. Carries the raw
    /// type byte and body for logging only.
    Unknown {
        msg_type: u8,
    },
}

fn topic_id_to_wire(topic_id: TopicId) -> u16 {
    topic_id.unwrap_or(0)
}

fn topic_id_from_wire(raw: u16) -> TopicId {
    if raw == 0 {
        None
    } else {
        Some(raw)
    }
}

fn read_u16(buf: &[u8], offset: usize, field: &'static str) -> Result<u16, DecodeError> {
    let slice = buf
        .get(offset..offset + 2)
        .ok_or(DecodeError::TruncatedField(field))?;
    Ok(BigEndian::read_u16(slice))
}

fn read_u8(buf: &[u8], offset: usize, field: &'static str) -> Result<u8, DecodeError> {
    buf.get(offset).copied().ok_or(DecodeError::TruncatedField(field))
}

impl Message {
    /// Parse a single UDP datagram payload into a `Message`.
    ///
    /// # Errors
    /// Returns `DecodeError` for any structural violation: bad length
    /// header, declared length not matching `buf.len()`, unknown or
    /// missing message type, a truncated fixed-size field, a bad protocol
    /// id, or non-UTF-8 in a field that requires it.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let header = decode_length_header(buf)?;
        if header.total_len != buf.len() {
            return Err(DecodeError::LengthMismatch {
                declared: header.total_len,
                actual: buf.len(),
            });
        }
        let msg_type_byte = *buf
            .get(header.header_len)
            .ok_or(DecodeError::MissingMessageType)?;
        let body = &buf[header.header_len + 1..];

        match MsgType::from(msg_type_byte) {
            MsgType::Connect => Self::decode_connect(body),
            MsgType::Connack => Self::decode_connack(body),
            MsgType::Register => Self::decode_register(body),
            MsgType::Regack => Self::decode_regack(body),
            MsgType::Publish => Self::decode_publish(body),
            MsgType::Puback => Self::decode_puback(body),
            MsgType::Pingreq => Self::decode_pingreq(body),
            MsgType::Pingresp => Ok(Self::Pingresp),
            MsgType::Disconnect => Self::decode_disconnect(body),
            MsgType::Unknown(byte) => Ok(Self::Unknown { msg_type: byte }),
        }
    }

    fn decode_connect(body: &[u8]) -> Result<Self, DecodeError> {
        let flags = Flags::from_u8(read_u8(body, 0, "connect.flags")?);
        let protocol_id = read_u8(body, 1, "connect.protocol_id")?;
        if protocol_id != PROTOCOL_ID {
            return Err(DecodeError::InvalidProtocolId(protocol_id));
        }
        let duration = read_u16(body, 2, "connect.duration")?;
        let client_id = body.get(4..).unwrap_or(&[]).to_vec();
        Ok(Self::Connect {
            flags,
            duration,
            client_id,
        })
    }

    fn decode_connack(body: &[u8]) -> Result<Self, DecodeError> {
        let return_code = ReturnCode::from(read_u8(body, 0, "connack.return_code")?);
        Ok(Self::Connack { return_code })
    }

    fn decode_register(body: &[u8]) -> Result<Self, DecodeError> {
        let topic_id = topic_id_from_wire(read_u16(body, 0, "register.topic_id")?);
        let msg_id = read_u16(body, 2, "register.msg_id")?;
        let name_bytes = body.get(4..).unwrap_or(&[]);
        let topic_name = String::from_utf8(name_bytes.to_vec())
            .map_err(|_| DecodeError::InvalidUtf8("register.topic_name"))?;
        Ok(Self::Register {
            topic_id,
            msg_id,
            topic_name,
        })
    }

    fn decode_regack(body: &[u8]) -> Result<Self, DecodeError> {
        let topic_id = topic_id_from_wire(read_u16(body, 0, "regack.topic_id")?);
        let msg_id = read_u16(body, 2, "regack.msg_id")?;
        let return_code = ReturnCode::from(read_u8(body, 4, "regack.return_code")?);
        Ok(Self::Regack {
            topic_id,
            msg_id,
            return_code,
        })
    }

    fn decode_publish(body: &[u8]) -> Result<Self, DecodeError> {
        let flags = Flags::from_u8(read_u8(body, 0, "publish.flags")?);
        let topic_id = read_u16(body, 1, "publish.topic_id")?;
        let msg_id = read_u16(body, 3, "publish.msg_id")?;
        let data = body.get(5..).unwrap_or(&[]).to_vec();
        Ok(Self::Publish {
            flags,
            topic_id,
            msg_id,
            data,
        })
    }

    fn decode_puback(body: &[u8]) -> Result<Self, DecodeError> {
        let topic_id = read_u16(body, 0, "puback.topic_id")?;
        let msg_id = read_u16(body, 2, "puback.msg_id")?;
        let return_code = ReturnCode::from(read_u8(body, 4, "puback.return_code")?);
        Ok(Self::Puback {
            topic_id,
            msg_id,
            return_code,
        })
    }

    fn decode_pingreq(body: &[u8]) -> Result<Self, DecodeError> {
        let client_id = if body.is_empty() {
            None
        } else {
            Some(body.to_vec())
        };
        Ok(Self::Pingreq { client_id })
    }

    fn decode_disconnect(body: &[u8]) -> Result<Self, DecodeError> {
        let duration = if body.is_empty() {
            None
        } else {
            Some(read_u16(body, 0, "disconnect.duration")?)
        };
        Ok(Self::Disconnect { duration })
    }

    /// Serialize `self` back into a single UDP datagram payload.
    ///
    /// # Errors
    /// Returns `EncodeError::TooLong` if the encoded body plus header would
    /// exceed `u16::MAX` bytes, the protocol's length-field ceiling.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let (msg_type, mut body) = match self {
            Self::Connect {
                flags,
                duration,
                client_id,
            } => {
                let mut body = vec![flags.to_u8(), PROTOCOL_ID];
                body.extend_from_slice(&duration.to_be_bytes());
                body.extend_from_slice(client_id);
                (MsgType::Connect, body)
            }
            Self::Connack { return_code } => (MsgType::Connack, vec![u8::from(*return_code)]),
            Self::Register {
                topic_id,
                msg_id,
                topic_name,
            } => {
                let mut body = topic_id_to_wire(*topic_id).to_be_bytes().to_vec();
                body.extend_from_slice(&msg_id.to_be_bytes());
                body.extend_from_slice(topic_name.as_bytes());
                (MsgType::Register, body)
            }
            Self::Regack {
                topic_id,
                msg_id,
                return_code,
            } => {
                let mut body = topic_id_to_wire(*topic_id).to_be_bytes().to_vec();
                body.extend_from_slice(&msg_id.to_be_bytes());
                body.push(u8::from(*return_code));
                (MsgType::Regack, body)
            }
            Self::Publish {
                flags,
                topic_id,
                msg_id,
                data,
            } => {
                let mut body = vec![flags.to_u8()];
                body.extend_from_slice(&topic_id.to_be_bytes());
                body.extend_from_slice(&msg_id.to_be_bytes());
                body.extend_from_slice(data);
                (MsgType::Publish, body)
            }
            Self::Puback {
                topic_id,
                msg_id,
                return_code,
            } => {
                let mut body = topic_id.to_be_bytes().to_vec();
                body.extend_from_slice(&msg_id.to_be_bytes());
                body.push(u8::from(*return_code));
                (MsgType::Puback, body)
            }
            Self::Pingreq { client_id } => {
                let body = client_id.clone().unwrap_or_default();
                (MsgType::Pingreq, body)
            }
            Self::Pingresp => (MsgType::Pingresp, Vec::new()),
            Self::Disconnect { duration } => {
                let body = duration.map(|d| d.to_be_bytes().to_vec()).unwrap_or_default();
                (MsgType::Disconnect, body)
            }
            Self::Unknown { msg_type } => (MsgType::Unknown(*msg_type), Vec::new()),
        };

        // header_len depends on total_len, and total_len depends on
        // header_len; break the cycle by defining the 1-byte form for
        // total_len < 256 and the 3-byte form otherwise, so we probe with
        // the 1-byte-header length first.
        let total_len_short = 1 + 1 + body.len();
        let mut out = Vec::with_capacity(total_len_short.max(3 + 1 + body.len()));
        if total_len_short < 256 {
            encode_length_header(total_len_short, &mut out)?;
        } else {
            let total_len_long = 3 + 1 + body.len();
            encode_length_header(total_len_long, &mut out)?;
        }
        out.push(u8::from(msg_type));
        out.append(&mut body);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn decodes_connect_scenario() {
        let client_id = b"94193A04010020B8".to_vec();
        let mut raw = vec![22, 0x04, 0b0000_0100, 0x01, 0xFD, 0x20];
        raw.extend_from_slice(&client_id);
        let msg = Message::decode(&raw).unwrap();
        assert_eq!(
            msg,
            Message::Connect {
                flags: Flags::from_u8(0b0000_0100),
                duration: 0xFD20,
                client_id,
            }
        );
        assert!(matches!(msg, Message::Connect { flags, .. } if flags.clean_session));
    }

    #[test]
    fn encodes_connack_scenario() {
        let bytes = Message::Connack {
            return_code: ReturnCode::Accepted,
        }
        .encode()
        .unwrap();
        assert_eq!(hex(&bytes), "03 05 00");
    }

    #[test]
    fn register_then_regack_scenario() {
        let topic_name = "mr/94193A04010020B8/standard/json".to_string();
        let msg_id = 0xFFCB;
        let register = Message::Register {
            topic_id: None,
            msg_id,
            topic_name: topic_name.clone(),
        };
        let encoded = register.encode().unwrap();
        assert_eq!(encoded.len(), 6 + topic_name.len());
        assert_eq!(encoded[0] as usize, encoded.len());
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(decoded, register);

        let regack = Message::Regack {
            topic_id: Some(1),
            msg_id,
            return_code: ReturnCode::Accepted,
        };
        assert_eq!(hex(&regack.encode().unwrap()), "07 0B 00 01 FF CB 00");
    }

    #[test]
    fn publish_then_puback_scenario() {
        let puback = Message::Puback {
            topic_id: 1,
            msg_id: 0xC792,
            return_code: ReturnCode::Accepted,
        };
        assert_eq!(hex(&puback.encode().unwrap()), "07 0D 00 01 C7 92 00");
    }

    #[test]
    fn disconnect_scenario() {
        let bytes = Message::Disconnect { duration: None }.encode().unwrap();
        assert_eq!(hex(&bytes), "02 18");
    }

    #[test]
    fn regack_with_congestion_has_null_topic_id() {
        let regack = Message::Regack {
            topic_id: None,
            msg_id: 0x0001,
            return_code: ReturnCode::Congestion,
        };
        assert_eq!(hex(&regack.encode().unwrap()), "07 0B 00 00 00 01 01");
    }

    #[test]
    fn empty_publish_payload_round_trips() {
        let publish = Message::Publish {
            flags: Flags::default(),
            topic_id: 1,
            msg_id: 7,
            data: Vec::new(),
        };
        let encoded = publish.encode().unwrap();
        assert_eq!(Message::decode(&encoded).unwrap(), publish);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let mut encoded = Message::Pingresp.encode().unwrap();
        encoded[0] = 5; // lies about the length
        assert!(matches!(
            Message::decode(&encoded),
            Err(DecodeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn non_utf8_topic_name_is_rejected() {
        let mut body = vec![0x0A, 0x00, 0x00, 0x00, 0x01];
        body.push(0xFF); // invalid UTF-8 byte
        body.push(0xFE);
        let mut raw = vec![1 + body.len() as u8];
        raw.extend_from_slice(&body);
        assert!(matches!(
            Message::decode(&raw),
            Err(DecodeError::InvalidUtf8("register.topic_name"))
        ));
    }

    #[test]
    fn unknown_message_type_is_recognised_not_rejected() {
        let raw = vec![2, 0x01]; // ADVERTISE, not handled by this gateway
        let msg = Message::decode(&raw).unwrap();
        assert_eq!(msg, Message::Unknown { msg_type: 0x01 });
    }

    proptest::proptest! {
        #[test]
        fn publish_round_trips_for_arbitrary_payload(
            topic_id: u16,
            msg_id: u16,
            data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64),
        ) {
            let publish = Message::Publish {
                flags: Flags::default(),
                topic_id,
                msg_id,
                data,
            };
            let encoded = publish.encode().unwrap();
            proptest::prop_assert_eq!(Message::decode(&encoded).unwrap(), publish);
        }
    }
}
