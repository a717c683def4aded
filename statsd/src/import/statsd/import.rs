/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use log::{debug, info, warn};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use super::StatsdRecordVisitor;
use crate::collect::AggregateStore;
use crate::stat::ServerStats;

const RECV_BUF_SIZE: usize = u16::MAX as usize;

/// The UDP ingestion listener.
pub struct StatsdImporter {
    socket: UdpSocket,
    local_addr: SocketAddr,
    store: Arc<AggregateStore>,
    stats: Arc<ServerStats>,
    relative_gauges: bool,
}

impl StatsdImporter {
    pub async fn bind(
        addr: SocketAddr,
        store: Arc<AggregateStore>,
        stats: Arc<ServerStats>,
        relative_gauges: bool,
    ) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .context(format!("failed to bind udp socket to {addr}"))?;
        let local_addr = socket
            .local_addr()
            .context("failed to get local address of the udp socket")?;
        Ok(StatsdImporter {
            socket,
            local_addr,
            store,
            stats,
            relative_gauges,
        })
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn into_running(self, mut quit: broadcast::Receiver<()>) {
        info!("started statsd importer at udp {}", self.local_addr);

        let mut buf = vec![0u8; RECV_BUF_SIZE];
        loop {
            tokio::select! {
                biased;

                _ = quit.recv() => {
                    info!("statsd importer at udp {} will go offline", self.local_addr);
                    break;
                }
                r = self.socket.recv_from(&mut buf) => {
                    match r {
                        Ok((len, peer_addr)) => {
                            self.receive_packet(&buf[..len], peer_addr);
                        }
                        Err(e) => {
                            warn!(
                                "statsd importer at udp {}: failed to receive datagram: {e}",
                                self.local_addr
                            );
                        }
                    }
                }
            }
        }

        info!("stopped statsd importer at udp {}", self.local_addr);
    }

    /// Parse a datagram and apply every valid sample to the store.
    ///
    /// Returns the number of bad lines in it. The datagram is counted only
    /// after all of its samples are in the store.
    pub fn receive_packet(&self, packet: &[u8], peer_addr: SocketAddr) -> usize {
        let mut bad_lines = 0;
        for r in StatsdRecordVisitor::new(packet, self.relative_gauges) {
            match r {
                Ok(record) => self.store.apply(record),
                Err(e) => {
                    debug!("invalid statsd line from {peer_addr}: {e}");
                    bad_lines += 1;
                }
            }
        }
        if bad_lines > 0 {
            self.stats.add_bad_lines(bad_lines as u64);
        }
        self.stats.add_datagram();
        bad_lines
    }
}
