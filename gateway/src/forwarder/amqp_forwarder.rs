// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use async_trait::async_trait;
use deadpool_lapin::Pool;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, ExchangeKind};

use super::{translate_topic, ForwardError, Forwarder};

/// [`Forwarder`] backed by a topic exchange on an AMQP broker. The pool
/// supplies connection reuse; this type holds no state of its own beyond
/// the exchange name and is stateless per call.
pub struct AmqpForwarder {
    pool: Pool,
    exchange: String,
}

impl AmqpForwarder {
    #[must_use]
    pub fn new(pool: Pool, exchange: String) -> Self {
        Self { pool, exchange }
    }

    /// Declare the topic exchange this forwarder publishes to. Call once
    /// at startup; idempotent against a broker that already has it.
    ///
    /// # Errors
    /// Returns `ForwardError` if a connection could not be checked out or
    /// the declare call failed.
    pub async fn declare_exchange(&self) -> Result<(), ForwardError> {
        let conn = self.pool.get().await.map_err(|e| ForwardError(e.to_string()))?;
        let channel = conn.create_channel().await.map_err(|e| ForwardError(e.to_string()))?;
        channel
            .exchange_declare(
                &self.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| ForwardError(e.to_string()))
    }
}

#[async_trait]
impl Forwarder for AmqpForwarder {
    async fn forward(&self, topic: &str, payload: &[u8], _qos: u8) -> Result<(), ForwardError> {
        let routing_key = translate_topic(topic);
        let conn = self.pool.get().await.map_err(|e| ForwardError(e.to_string()))?;
        let channel = conn.create_channel().await.map_err(|e| ForwardError(e.to_string()))?;
        channel
            .basic_publish(
                &self.exchange,
                &routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| ForwardError(e.to_string()))?
            .await
            .map_err(|e| ForwardError(e.to_string()))?;
        Ok(())
    }
}
