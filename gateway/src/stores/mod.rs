// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

mod client_store;
mod memory_store;
mod redis_client_store;
mod redis_topic_store;
mod topic_store;

pub use client_store::ClientStore;
pub use memory_store::{InMemoryClientStore, InMemoryTopicStore};
pub use redis_client_store::RedisClientStore;
pub use redis_topic_store::RedisTopicStore;
pub use topic_store::TopicStore;

use std::fmt::{self, Display};
use std::future::Future;
use std::time::Duration;

/// Run `fut`, turning a timeout or a transport error into
/// `StoreError::Unavailable`. Shared by the Redis-backed client and topic
/// stores so a hung backend fails a call instead of blocking a worker
/// indefinitely.
pub(crate) async fn call_with_timeout<T, E, F>(duration: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(StoreError::Unavailable(err.to_string())),
        Err(_) => Err(StoreError::Unavailable("store call timed out".to_owned())),
    }
}

/// Errors exported across the store contract boundary. Transport-specific
/// failures (a Redis error, a connection timeout) are translated into one
/// of these two kinds before they reach the dispatcher; key-value-specific
/// errors never leak past this boundary.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StoreError {
    NotFound,
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}
