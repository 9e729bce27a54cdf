// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::fmt::{self, Display};
use std::io;
use tokio::sync::mpsc;

use crate::server::Inbound;

use codec::{DecodeError, EncodeError as CodecEncodeError};

/// Represent the types of errors.
#[derive(Clone, Debug)]
pub enum ErrorKind {
    /// Error occurred while performing I/O.
    IoError,

    /// A message could not be serialized to bytes.
    EncodeError,

    /// A datagram failed to parse as a well-formed MQTT-SN message.
    DecodeError,

    /// Invalid configuration value.
    ConfigError,

    /// Error talking to the Valkey/Redis-compatible key-value store.
    RedisError,

    /// Error talking to the AMQP broker.
    AmqpError,

    /// Internal channel between the UDP receive loop and a worker is closed.
    ChannelError,
}

#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_owned(),
        }
    }

    #[must_use]
    pub fn from_string(kind: ErrorKind, message: String) -> Self {
        Self { kind, message }
    }

    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::from_string(ErrorKind::IoError, format!("IoError {err}"))
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Self::from_string(ErrorKind::RedisError, format!("{err}"))
    }
}

impl From<lapin::Error> for Error {
    fn from(err: lapin::Error) -> Self {
        Self::from_string(ErrorKind::AmqpError, format!("{err}"))
    }
}

impl From<deadpool_lapin::PoolError> for Error {
    fn from(err: deadpool_lapin::PoolError) -> Self {
        Self::from_string(ErrorKind::AmqpError, format!("{err}"))
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Self::from_string(ErrorKind::DecodeError, format!("{err}"))
    }
}

impl From<CodecEncodeError> for Error {
    fn from(err: CodecEncodeError) -> Self {
        Self::from_string(ErrorKind::EncodeError, format!("{err}"))
    }
}

impl From<mpsc::error::SendError<Inbound>> for Error {
    fn from(err: mpsc::error::SendError<Inbound>) -> Self {
        Self::from_string(ErrorKind::ChannelError, format!("Inbound channel error: {err}"))
    }
}
