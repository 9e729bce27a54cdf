// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use async_trait::async_trait;

use super::StoreError;

/// Per client-id, an ordered list of topic names, 1-based-indexed. One
/// production implementation ([`super::RedisTopicStore`]) and one
/// in-memory test double ([`super::InMemoryTopicStore`]).
#[async_trait]
pub trait TopicStore: Send + Sync {
    /// Append `topic_name` to `client_id`'s topic list; returns the new
    /// 1-based index. Duplicates are allowed: re-registering an
    /// already-present name appends a new entry.
    async fn add_topic(&self, client_id: &[u8], topic_name: &str) -> Result<u16, StoreError>;

    /// Look up the topic name at 1-based `topic_id` in `client_id`'s list.
    ///
    /// # Errors
    /// `StoreError::NotFound` if `topic_id` is outside the list length;
    /// `StoreError::Unavailable` on transport error.
    async fn get_topic(&self, client_id: &[u8], topic_id: u16) -> Result<String, StoreError>;

    /// Erase the entire topic list for `client_id` (used on clean-session
    /// CONNECT).
    async fn delete_all(&self, client_id: &[u8]) -> Result<(), StoreError>;

    /// Refresh the TTL on `client_id`'s topic list.
    async fn extend_ttl(&self, client_id: &[u8]) -> Result<(), StoreError>;
}
