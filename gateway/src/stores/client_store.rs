// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::net::SocketAddr;

use async_trait::async_trait;

use super::StoreError;
use crate::types::ClientId;

/// Remembers which client-id corresponds to a given remote address, with a
/// refreshable TTL. One production implementation
/// ([`super::RedisClientStore`]) and one in-memory test double
/// ([`super::InMemoryClientStore`]).
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Create or overwrite the binding from `remote_addr` to `client_id`,
    /// with a fresh TTL.
    async fn add(&self, client_id: &[u8], remote_addr: SocketAddr) -> Result<(), StoreError>;

    /// Look up the client-id bound to `remote_addr`.
    ///
    /// # Errors
    /// `StoreError::NotFound` if no binding exists; `StoreError::Unavailable`
    /// if the backing service could not be reached.
    async fn get(&self, remote_addr: SocketAddr) -> Result<ClientId, StoreError>;

    /// Remove the binding for `remote_addr`. Idempotent: absent is not an
    /// error.
    async fn delete(&self, remote_addr: SocketAddr) -> Result<(), StoreError>;

    /// Refresh the TTL for `remote_addr`'s binding without touching its
    /// value.
    async fn extend_ttl(&self, remote_addr: SocketAddr) -> Result<(), StoreError>;
}
