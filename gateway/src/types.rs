// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::net::SocketAddr;

/// Opaque client identifier as carried on the wire, 1..23 bytes typical.
/// Not required to be UTF-8; stored and compared as raw bytes.
pub type ClientId = Vec<u8>;

/// Build the client-store key for `remote_addr`, honoring the
/// `use_port_number_in_client_store` configuration flag.
#[must_use]
pub fn client_store_key(remote_addr: SocketAddr, use_port_in_key: bool) -> String {
    if use_port_in_key {
        format!("client:{}:{}", remote_addr.ip(), remote_addr.port())
    } else {
        format!("client:{}", remote_addr.ip())
    }
}

/// Build the topic-store key for `client_id`. The client-id is rendered
/// lossily as UTF-8 since that's how the source keys the list;
/// non-UTF-8 client-ids are rare in practice and still produce a stable,
/// if unreadable, key.
#[must_use]
pub fn topic_store_key(client_id: &[u8]) -> String {
    format!("topic:{}", String::from_utf8_lossy(client_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_includes_port_when_configured() {
        let addr: SocketAddr = "10.0.0.1:1883".parse().unwrap();
        assert_eq!(client_store_key(addr, true), "client:10.0.0.1:1883");
        assert_eq!(client_store_key(addr, false), "client:10.0.0.1");
    }

    #[test]
    fn topic_key_uses_client_id() {
        assert_eq!(topic_store_key(b"sensor-01"), "topic:sensor-01");
    }
}
