// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::collections::HashMap;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ClientStore, StoreError, TopicStore};
use crate::types::ClientId;

/// In-memory [`ClientStore`] test double. TTL is not modeled: entries live
/// for the process lifetime, which is fine for the single-test-run scope
/// this is used in.
#[derive(Default)]
pub struct InMemoryClientStore {
    bindings: Mutex<HashMap<SocketAddr, ClientId>>,
}

impl InMemoryClientStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for InMemoryClientStore {
    async fn add(&self, client_id: &[u8], remote_addr: SocketAddr) -> Result<(), StoreError> {
        self.bindings
            .lock()
            .await
            .insert(remote_addr, client_id.to_vec());
        Ok(())
    }

    async fn get(&self, remote_addr: SocketAddr) -> Result<ClientId, StoreError> {
        self.bindings
            .lock()
            .await
            .get(&remote_addr)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, remote_addr: SocketAddr) -> Result<(), StoreError> {
        self.bindings.lock().await.remove(&remote_addr);
        Ok(())
    }

    async fn extend_ttl(&self, remote_addr: SocketAddr) -> Result<(), StoreError> {
        if self.bindings.lock().await.contains_key(&remote_addr) {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }
}

/// In-memory [`TopicStore`] test double. A mutex around each client's
/// topic-name list is sufficient for serializing concurrent writes within
/// a single process.
#[derive(Default)]
pub struct InMemoryTopicStore {
    topics: Mutex<HashMap<ClientId, Vec<String>>>,
}

impl InMemoryTopicStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TopicStore for InMemoryTopicStore {
    async fn add_topic(&self, client_id: &[u8], topic_name: &str) -> Result<u16, StoreError> {
        let mut topics = self.topics.lock().await;
        let list = topics.entry(client_id.to_vec()).or_default();
        list.push(topic_name.to_owned());
        u16::try_from(list.len())
            .map_err(|_| StoreError::Unavailable("topic list overflowed u16".to_owned()))
    }

    async fn get_topic(&self, client_id: &[u8], topic_id: u16) -> Result<String, StoreError> {
        if topic_id == 0 {
            return Err(StoreError::NotFound);
        }
        let topics = self.topics.lock().await;
        topics
            .get(client_id)
            .and_then(|list| list.get(usize::from(topic_id) - 1))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete_all(&self, client_id: &[u8]) -> Result<(), StoreError> {
        self.topics.lock().await.remove(client_id);
        Ok(())
    }

    async fn extend_ttl(&self, client_id: &[u8]) -> Result<(), StoreError> {
        if self.topics.lock().await.contains_key(client_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_round_trips() {
        let store = InMemoryClientStore::new();
        let addr: SocketAddr = "127.0.0.1:1883".parse().unwrap();
        assert_eq!(store.get(addr).await, Err(StoreError::NotFound));
        store.add(b"sensor-01", addr).await.unwrap();
        assert_eq!(store.get(addr).await.unwrap(), b"sensor-01");
        store.delete(addr).await.unwrap();
        assert_eq!(store.get(addr).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn topic_ids_are_monotonic_per_client() {
        let store = InMemoryTopicStore::new();
        for i in 1..=999u16 {
            let topic_id = store.add_topic(b"sensor-01", &format!("t/{i}")).await.unwrap();
            assert_eq!(topic_id, i);
        }
        for i in 1..=999u16 {
            assert_eq!(
                store.get_topic(b"sensor-01", i).await.unwrap(),
                format!("t/{i}")
            );
        }
    }

    #[tokio::test]
    async fn topic_id_zero_is_not_found() {
        let store = InMemoryTopicStore::new();
        assert_eq!(
            store.get_topic(b"sensor-01", 0).await,
            Err(StoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn clean_session_erases_topic_list() {
        let store = InMemoryTopicStore::new();
        store.add_topic(b"sensor-01", "a/b").await.unwrap();
        store.delete_all(b"sensor-01").await.unwrap();
        assert_eq!(
            store.get_topic(b"sensor-01", 1).await,
            Err(StoreError::NotFound)
        );
    }
}
