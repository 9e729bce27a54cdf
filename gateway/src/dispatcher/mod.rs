// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::net::SocketAddr;
use std::sync::Arc;

use codec::{Message, ReturnCode};
use log::{debug, info, warn};

use crate::forwarder::Forwarder;
use crate::stores::{ClientStore, StoreError, TopicStore};

/// Per-datagram orchestrator: parse, classify, enforce session/topic
/// preconditions, forward, synthesize exactly one acknowledgement. Holds
/// no cross-datagram state beyond what the stores provide.
pub struct Dispatcher {
    client_store: Arc<dyn ClientStore>,
    topic_store: Arc<dyn TopicStore>,
    forwarder: Arc<dyn Forwarder>,
    extend_ttl_on_publish: bool,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        client_store: Arc<dyn ClientStore>,
        topic_store: Arc<dyn TopicStore>,
        forwarder: Arc<dyn Forwarder>,
        extend_ttl_on_publish: bool,
    ) -> Self {
        Self {
            client_store,
            topic_store,
            forwarder,
            extend_ttl_on_publish,
        }
    }

    /// Handle one received datagram. Returns the bytes to send back, or
    /// `None` if the datagram produces no reply (parse failure, unknown
    /// message type).
    pub async fn dispatch(&self, data: &[u8], remote_addr: SocketAddr) -> Option<Vec<u8>> {
        let message = match Message::decode(data) {
            Ok(message) => message,
            Err(err) => {
                warn!("dropping malformed datagram from {remote_addr}: {err}");
                return None;
            }
        };

        let response = match message {
            Message::Connect {
                flags, client_id, ..
            } => Some(self.handle_connect(remote_addr, flags.clean_session, &client_id).await),
            Message::Register {
                msg_id, topic_name, ..
            } => Some(self.handle_register(remote_addr, msg_id, &topic_name).await),
            Message::Publish {
                flags,
                topic_id,
                msg_id,
                data,
            } => Some(
                self.handle_publish(remote_addr, flags.qos, topic_id, msg_id, &data)
                    .await,
            ),
            Message::Pingreq { .. } => {
                debug!("pingreq from {remote_addr}");
                Some(Message::Pingresp)
            }
            other => {
                debug!("dropping unhandled message from {remote_addr}: {other:?}");
                None
            }
        };

        response.map(|msg| match msg.encode() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("failed to encode response to {remote_addr}: {err}");
                Vec::new()
            }
        })
    }

    async fn handle_connect(
        &self,
        remote_addr: SocketAddr,
        clean_session: bool,
        client_id: &[u8],
    ) -> Message {
        if clean_session {
            if let Err(StoreError::Unavailable(reason)) = self.topic_store.delete_all(client_id).await
            {
                warn!("topic store unavailable during clean-session delete for {remote_addr}: {reason}");
            }
        }

        match self.client_store.add(client_id, remote_addr).await {
            Ok(()) => {
                info!("connect accepted for {remote_addr}");
                Message::Connack {
                    return_code: ReturnCode::Accepted,
                }
            }
            Err(StoreError::Unavailable(reason)) => {
                warn!("client store unavailable on connect from {remote_addr}: {reason}");
                Message::Connack {
                    return_code: ReturnCode::Congestion,
                }
            }
            Err(StoreError::NotFound) => unreachable!("add() never returns NotFound"),
        }
    }

    async fn handle_register(
        &self,
        remote_addr: SocketAddr,
        msg_id: u16,
        topic_name: &str,
    ) -> Message {
        let client_id = match self.client_store.get(remote_addr).await {
            Ok(client_id) => client_id,
            Err(StoreError::NotFound) => {
                info!("register from unknown client {remote_addr}, disconnecting");
                return Message::Disconnect { duration: None };
            }
            Err(StoreError::Unavailable(reason)) => {
                warn!("client store unavailable on register from {remote_addr}: {reason}");
                return Message::Regack {
                    topic_id: None,
                    msg_id,
                    return_code: ReturnCode::Congestion,
                };
            }
        };

        match self.topic_store.add_topic(&client_id, topic_name).await {
            Ok(topic_id) => {
                debug!("registered topic {topic_name:?} as id {topic_id} for {remote_addr}");
                Message::Regack {
                    topic_id: Some(topic_id),
                    msg_id,
                    return_code: ReturnCode::Accepted,
                }
            }
            Err(StoreError::Unavailable(reason)) => {
                warn!("topic store unavailable on register from {remote_addr}: {reason}");
                Message::Regack {
                    topic_id: None,
                    msg_id,
                    return_code: ReturnCode::Congestion,
                }
            }
            Err(StoreError::NotFound) => unreachable!("add_topic() never returns NotFound"),
        }
    }

    async fn handle_publish(
        &self,
        remote_addr: SocketAddr,
        qos: u8,
        topic_id: u16,
        msg_id: u16,
        data: &[u8],
    ) -> Message {
        let puback = |return_code| Message::Puback {
            topic_id,
            msg_id,
            return_code,
        };

        let client_id = match self.client_store.get(remote_addr).await {
            Ok(client_id) => client_id,
            Err(StoreError::NotFound) => {
                info!("publish from unknown client {remote_addr}, disconnecting");
                return Message::Disconnect { duration: None };
            }
            Err(StoreError::Unavailable(reason)) => {
                warn!("client store unavailable on publish from {remote_addr}: {reason}");
                return puback(ReturnCode::Congestion);
            }
        };

        if qos > 1 {
            debug!("rejecting unsupported qos={qos} publish from {remote_addr}");
            return puback(ReturnCode::NotSupported);
        }

        let topic = match self.topic_store.get_topic(&client_id, topic_id).await {
            Ok(topic) => topic,
            Err(StoreError::NotFound) => {
                debug!("publish to unregistered topic_id={topic_id} from {remote_addr}");
                return puback(ReturnCode::InvalidTopic);
            }
            Err(StoreError::Unavailable(reason)) => {
                warn!("topic store unavailable on publish from {remote_addr}: {reason}");
                return puback(ReturnCode::Congestion);
            }
        };

        if let Err(err) = self.forwarder.forward(&topic, data, qos).await {
            warn!("forwarding failed for {remote_addr} on topic {topic:?}: {err}");
            return puback(ReturnCode::Congestion);
        }

        if self.extend_ttl_on_publish {
            if let Err(StoreError::Unavailable(reason)) =
                self.client_store.extend_ttl(remote_addr).await
            {
                debug!("client store ttl extension failed for {remote_addr}: {reason}");
            }
            if let Err(StoreError::Unavailable(reason)) = self.topic_store.extend_ttl(&client_id).await
            {
                debug!("topic store ttl extension failed for {remote_addr}: {reason}");
            }
        }

        puback(ReturnCode::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{InMemoryClientStore, InMemoryTopicStore};
    use codec::Flags;
    use std::sync::Mutex as StdMutex;

    struct FakeForwarder {
        calls: StdMutex<Vec<(String, Vec<u8>, u8)>>,
        fail: bool,
    }

    impl FakeForwarder {
        fn new() -> Self {
            Self {
                calls: StdMutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: StdMutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait::async_trait]
    impl Forwarder for FakeForwarder {
        async fn forward(
            &self,
            topic: &str,
            payload: &[u8],
            qos: u8,
        ) -> Result<(), crate::forwarder::ForwardError> {
            if self.fail {
                return Err(crate::forwarder::ForwardError("boom".to_owned()));
            }
            self.calls
                .lock()
                .unwrap()
                .push((topic.to_owned(), payload.to_vec(), qos));
            Ok(())
        }
    }

    fn build_dispatcher(forwarder: Arc<dyn Forwarder>) -> Dispatcher {
        Dispatcher::new(
            Arc::new(InMemoryClientStore::new()),
            Arc::new(InMemoryTopicStore::new()),
            forwarder,
            true,
        )
    }

    fn addr() -> SocketAddr {
        "10.0.0.5:1883".parse().unwrap()
    }

    #[tokio::test]
    async fn connect_then_disconnect_for_stray_publish() {
        let dispatcher = build_dispatcher(Arc::new(FakeForwarder::new()));
        let response = dispatcher
            .dispatch(
                &Message::Publish {
                    flags: Flags::default(),
                    topic_id: 1,
                    msg_id: 7,
                    data: b"x".to_vec(),
                }
                .encode()
                .unwrap(),
                addr(),
            )
            .await
            .unwrap();
        assert_eq!(response, Message::Disconnect { duration: None }.encode().unwrap());
    }

    #[tokio::test]
    async fn full_connect_register_publish_flow() {
        let forwarder = Arc::new(FakeForwarder::new());
        let dispatcher = build_dispatcher(forwarder.clone());

        let connect = Message::Connect {
            flags: Flags {
                clean_session: true,
                ..Flags::default()
            },
            duration: 0xFD20,
            client_id: b"94193A04010020B8".to_vec(),
        };
        let connack = dispatcher.dispatch(&connect.encode().unwrap(), addr()).await.unwrap();
        assert_eq!(
            connack,
            Message::Connack {
                return_code: ReturnCode::Accepted
            }
            .encode()
            .unwrap()
        );

        let register = Message::Register {
            topic_id: None,
            msg_id: 0xFFCB,
            topic_name: "mr/94193A04010020B8/standard/json".to_owned(),
        };
        let regack = dispatcher.dispatch(&register.encode().unwrap(), addr()).await.unwrap();
        assert_eq!(
            regack,
            Message::Regack {
                topic_id: Some(1),
                msg_id: 0xFFCB,
                return_code: ReturnCode::Accepted,
            }
            .encode()
            .unwrap()
        );

        let publish = Message::Publish {
            flags: Flags::default(),
            topic_id: 1,
            msg_id: 0xC792,
            data: br#"{"temp":21}"#.to_vec(),
        };
        let puback = dispatcher.dispatch(&publish.encode().unwrap(), addr()).await.unwrap();
        assert_eq!(
            puback,
            Message::Puback {
                topic_id: 1,
                msg_id: 0xC792,
                return_code: ReturnCode::Accepted,
            }
            .encode()
            .unwrap()
        );

        let calls = forwarder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "mr.94193A04010020B8.standard.json");
        assert_eq!(calls[0].1, br#"{"temp":21}"#);
    }

    #[tokio::test]
    async fn unsupported_qos_is_rejected() {
        let dispatcher = build_dispatcher(Arc::new(FakeForwarder::new()));
        dispatcher
            .client_store
            .add(b"c1", addr())
            .await
            .unwrap();
        dispatcher
            .topic_store
            .add_topic(b"c1", "a/b")
            .await
            .unwrap();

        let publish = Message::Publish {
            flags: Flags {
                qos: 3,
                ..Flags::default()
            },
            topic_id: 1,
            msg_id: 9,
            data: Vec::new(),
        };
        let response = dispatcher.dispatch(&publish.encode().unwrap(), addr()).await.unwrap();
        assert_eq!(
            response,
            Message::Puback {
                topic_id: 1,
                msg_id: 9,
                return_code: ReturnCode::NotSupported,
            }
            .encode()
            .unwrap()
        );
    }

    #[tokio::test]
    async fn publish_to_unregistered_topic_is_invalid() {
        let dispatcher = build_dispatcher(Arc::new(FakeForwarder::new()));
        dispatcher.client_store.add(b"c1", addr()).await.unwrap();

        let publish = Message::Publish {
            flags: Flags::default(),
            topic_id: 42,
            msg_id: 9,
            data: Vec::new(),
        };
        let response = dispatcher.dispatch(&publish.encode().unwrap(), addr()).await.unwrap();
        assert_eq!(
            response,
            Message::Puback {
                topic_id: 42,
                msg_id: 9,
                return_code: ReturnCode::InvalidTopic,
            }
            .encode()
            .unwrap()
        );
    }

    #[tokio::test]
    async fn forwarding_failure_is_congestion() {
        let dispatcher = build_dispatcher(Arc::new(FakeForwarder::failing()));
        dispatcher.client_store.add(b"c1", addr()).await.unwrap();
        dispatcher.topic_store.add_topic(b"c1", "a/b").await.unwrap();

        let publish = Message::Publish {
            flags: Flags::default(),
            topic_id: 1,
            msg_id: 9,
            data: Vec::new(),
        };
        let response = dispatcher.dispatch(&publish.encode().unwrap(), addr()).await.unwrap();
        assert_eq!(
            response,
            Message::Puback {
                topic_id: 1,
                msg_id: 9,
                return_code: ReturnCode::Congestion,
            }
            .encode()
            .unwrap()
        );
    }

    #[tokio::test]
    async fn pingreq_always_gets_pingresp() {
        let dispatcher = build_dispatcher(Arc::new(FakeForwarder::new()));
        let response = dispatcher
            .dispatch(&Message::Pingreq { client_id: None }.encode().unwrap(), addr())
            .await
            .unwrap();
        assert_eq!(response, Message::Pingresp.encode().unwrap());
    }

    #[tokio::test]
    async fn malformed_datagram_is_dropped() {
        let dispatcher = build_dispatcher(Arc::new(FakeForwarder::new()));
        assert!(dispatcher.dispatch(&[5, 0xFF], addr()).await.is_none());
    }
}
