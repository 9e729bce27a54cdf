// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{call_with_timeout, StoreError, TopicStore};
use crate::types::topic_store_key;

/// Topic-list TTL: refreshed in lock-step with the client session, same
/// 7-day default.
const TOPIC_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Valkey/Redis-backed [`TopicStore`]. The topic list is a Redis list;
/// `RPUSH`'s return value (the new list length) is used directly as the
/// 1-based topic-id.
#[derive(Clone)]
pub struct RedisTopicStore {
    conn: ConnectionManager,
    call_timeout: Duration,
}

impl RedisTopicStore {
    #[must_use]
    pub fn new(conn: ConnectionManager, call_timeout: Duration) -> Self {
        Self { conn, call_timeout }
    }
}

#[async_trait]
impl TopicStore for RedisTopicStore {
    async fn add_topic(&self, client_id: &[u8], topic_name: &str) -> Result<u16, StoreError> {
        let mut conn = self.conn.clone();
        let key = topic_store_key(client_id);
        let new_len: u64 = call_with_timeout(self.call_timeout, conn.rpush(&key, topic_name)).await?;
        call_with_timeout(
            self.call_timeout,
            conn.expire::<_, ()>(&key, TOPIC_TTL_SECS as i64),
        )
        .await?;
        u16::try_from(new_len).map_err(|_| {
            StoreError::Unavailable(format!("topic list for client grew past u16::MAX: {new_len}"))
        })
    }

    async fn get_topic(&self, client_id: &[u8], topic_id: u16) -> Result<String, StoreError> {
        if topic_id == 0 {
            return Err(StoreError::NotFound);
        }
        let mut conn = self.conn.clone();
        let key = topic_store_key(client_id);
        let index = i64::from(topic_id) - 1;
        let value: Option<String> = call_with_timeout(self.call_timeout, conn.lindex(&key, index)).await?;
        value.ok_or(StoreError::NotFound)
    }

    async fn delete_all(&self, client_id: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        call_with_timeout(
            self.call_timeout,
            conn.del::<_, ()>(topic_store_key(client_id)),
        )
        .await
    }

    async fn extend_ttl(&self, client_id: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        call_with_timeout(
            self.call_timeout,
            conn.expire::<_, ()>(topic_store_key(client_id), TOPIC_TTL_SECS as i64),
        )
        .await
    }
}
