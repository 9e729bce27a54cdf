// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

mod amqp_forwarder;

pub use amqp_forwarder::AmqpForwarder;

use std::fmt::{self, Display};

use async_trait::async_trait;

/// A downstream publish failed. The dispatcher translates this into a
/// CONGESTION response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForwardError(pub String);

impl Display for ForwardError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "forwarding error: {}", self.0)
    }
}

impl std::error::Error for ForwardError {}

/// Relays an accepted PUBLISH onto the downstream messaging fabric.
/// Stateless per call: any connection pooling is the implementation's
/// concern.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Publish `payload` under `topic`, translated to the downstream
    /// routing scheme by the implementation.
    ///
    /// # Errors
    /// Returns `ForwardError` if the downstream publish could not be
    /// completed.
    async fn forward(&self, topic: &str, payload: &[u8], qos: u8) -> Result<(), ForwardError>;
}

/// Translate an MQTT-SN topic string into an AMQP topic-exchange routing
/// key: `/` becomes `.` (level separator) and `+` becomes `*` (MQTT
/// single-level wildcard to AMQP single-word wildcard). Asymmetric and
/// outbound-only.
#[must_use]
pub fn translate_topic(topic: &str) -> String {
    topic.replace('/', ".").replace('+', "*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_separators_and_wildcard() {
        assert_eq!(
            translate_topic("mr/94193A04010020B8/standard/json"),
            "mr.94193A04010020B8.standard.json"
        );
        assert_eq!(translate_topic("sensors/+/temp"), "sensors.*.temp");
    }
}
