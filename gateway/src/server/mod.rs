// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};

use crate::config::GeneralConfig;
use crate::dispatcher::Dispatcher;
use crate::error::Error;

/// Maximum size of a single UDP datagram this gateway will read.
const MAX_DATAGRAM_SIZE: usize = 65527;

/// One received datagram, queued between the receive loop and the worker
/// pool.
pub struct Inbound {
    pub remote_addr: SocketAddr,
    pub data: Vec<u8>,
}

/// Bind a UDP socket and run the gateway until `shutdown` fires. The
/// receive loop pushes datagrams onto a bounded channel (capacity =
/// `config.backpressure_limit`); a fixed pool of `config.worker_count`
/// tasks dequeues, runs the dispatcher, and writes the response back
/// through the shared socket.
///
/// # Errors
/// Returns `Error` with `ErrorKind::IoError` if the socket cannot be
/// bound.
pub async fn run(
    config: &GeneralConfig,
    dispatcher: Arc<Dispatcher>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Error> {
    let socket = Arc::new(UdpSocket::bind((config.host.as_str(), config.port)).await?);
    info!("listening on {}:{}", config.host, config.port);

    let (tx, rx) = mpsc::channel::<Inbound>(config.backpressure_limit);
    let workers = spawn_workers(config.worker_count.get(), rx, dispatcher, socket.clone());

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                info!("shutdown signal received, stopping receive loop");
                break;
            }
            recv = socket.recv_from(&mut buf) => {
                match recv {
                    Ok((len, remote_addr)) => {
                        let inbound = Inbound {
                            remote_addr,
                            data: buf[..len].to_vec(),
                        };
                        if tx.send(inbound).await.is_err() {
                            error!("worker channel closed, dropping datagram from {remote_addr}");
                        }
                    }
                    Err(err) => {
                        error!("udp recv error: {err}");
                    }
                }
            }
        }
    }

    drop(tx);
    for worker in workers {
        let _ = worker.await;
    }
    info!("all workers drained, exiting");
    Ok(())
}

fn spawn_workers(
    worker_count: usize,
    rx: mpsc::Receiver<Inbound>,
    dispatcher: Arc<Dispatcher>,
    socket: Arc<UdpSocket>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    (0..worker_count.max(1))
        .map(|id| {
            let rx = rx.clone();
            let dispatcher = dispatcher.clone();
            let socket = socket.clone();
            tokio::spawn(async move {
                loop {
                    let inbound = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };
                    let Some(inbound) = inbound else {
                        break;
                    };
                    if let Some(response) =
                        dispatcher.dispatch(&inbound.data, inbound.remote_addr).await
                    {
                        if let Err(err) = socket.send_to(&response, inbound.remote_addr).await {
                            error!("worker {id} failed to send response to {}: {err}", inbound.remote_addr);
                        }
                    }
                }
            })
        })
        .collect()
}
