// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{call_with_timeout, ClientStore, StoreError};
use crate::types::{client_store_key, ClientId};

/// Session TTL: "TTL (default 7 days)".
const CLIENT_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Valkey/Redis-backed [`ClientStore`]. Uses a [`ConnectionManager`], which
/// reconnects transparently on transport errors, so callers only ever see
/// `StoreError::Unavailable` for a genuinely dead backend.
#[derive(Clone)]
pub struct RedisClientStore {
    conn: ConnectionManager,
    use_port_in_key: bool,
    call_timeout: Duration,
}

impl RedisClientStore {
    #[must_use]
    pub fn new(conn: ConnectionManager, use_port_in_key: bool, call_timeout: Duration) -> Self {
        Self {
            conn,
            use_port_in_key,
            call_timeout,
        }
    }

    fn key(&self, remote_addr: SocketAddr) -> String {
        client_store_key(remote_addr, self.use_port_in_key)
    }
}

#[async_trait]
impl ClientStore for RedisClientStore {
    async fn add(&self, client_id: &[u8], remote_addr: SocketAddr) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        call_with_timeout(
            self.call_timeout,
            conn.set_ex::<_, _, ()>(self.key(remote_addr), client_id, CLIENT_TTL_SECS),
        )
        .await
    }

    async fn get(&self, remote_addr: SocketAddr) -> Result<ClientId, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> =
            call_with_timeout(self.call_timeout, conn.get(self.key(remote_addr))).await?;
        value.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, remote_addr: SocketAddr) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        call_with_timeout(self.call_timeout, conn.del::<_, ()>(self.key(remote_addr))).await
    }

    async fn extend_ttl(&self, remote_addr: SocketAddr) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        call_with_timeout(
            self.call_timeout,
            conn.expire::<_, ()>(self.key(remote_addr), CLIENT_TTL_SECS as i64),
        )
        .await
    }
}
