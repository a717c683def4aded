/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, broadcast};

use crate::collect::AggregateStore;
use crate::config::StatsdConfig;
use crate::flush::FlushHandle;
use crate::stat::ServerStats;

mod command;
mod response;

mod session;
use session::AdminSession;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("command `{0}` takes no argument")]
    UnexpectedArgument(&'static str),
    #[error("line too long")]
    LineTooLong,
    #[error("invalid utf-8 line")]
    InvalidUtf8,
    #[error("flush already in progress")]
    FlushInProgress,
    #[error("flush scheduler unavailable")]
    FlushUnavailable,
    #[error("too many admin sessions")]
    TooManySessions,
}

/// Everything an admin session may look at.
pub struct AdminContext {
    pub store: Arc<AggregateStore>,
    pub stats: Arc<ServerStats>,
    pub flush: Option<FlushHandle>,
    pub config: Arc<StatsdConfig>,
}

pub struct AdminServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    ctx: Arc<AdminContext>,
    sessions: Arc<Semaphore>,
}

impl AdminServer {
    pub async fn bind(addr: SocketAddr, ctx: Arc<AdminContext>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .context(format!("failed to bind admin tcp socket to {addr}"))?;
        let local_addr = listener
            .local_addr()
            .context("failed to get local address of the admin socket")?;
        let sessions = Arc::new(Semaphore::new(ctx.config.admin_max_sessions));
        Ok(AdminServer {
            listener,
            local_addr,
            ctx,
            sessions,
        })
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn into_running(self, mut quit: broadcast::Receiver<()>) {
        info!("started admin server at tcp {}", self.local_addr);

        loop {
            tokio::select! {
                biased;

                _ = quit.recv() => {
                    info!("admin server at tcp {} will go offline", self.local_addr);
                    break;
                }
                r = self.listener.accept() => {
                    match r {
                        Ok((stream, peer_addr)) => self.spawn_session(stream, peer_addr, &quit),
                        Err(e) => {
                            warn!("admin server at tcp {}: failed to accept: {e}", self.local_addr);
                        }
                    }
                }
            }
        }

        info!("stopped admin server at tcp {}", self.local_addr);
    }

    fn spawn_session(
        &self,
        mut stream: TcpStream,
        peer_addr: SocketAddr,
        quit: &broadcast::Receiver<()>,
    ) {
        let Ok(permit) = self.sessions.clone().try_acquire_owned() else {
            warn!("admin session from {peer_addr} refused: too many sessions");
            self.ctx.stats.add_admin_refused();
            tokio::spawn(async move {
                let msg = format!("ERROR {}\n", AdminError::TooManySessions);
                let _ = stream.write_all(msg.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
            return;
        };

        debug!("new admin session from {peer_addr}");
        let guard = self.ctx.stats.add_admin_session();
        let ctx = self.ctx.clone();
        let quit = quit.resubscribe();
        tokio::spawn(async move {
            let (r, w) = stream.into_split();
            let session = AdminSession::new(BufReader::new(r), w, ctx);
            if let Err(e) = session.run(quit).await {
                warn!("admin session from {peer_addr} error: {e:?}");
            }
            debug!("admin session from {peer_addr} closed");
            drop(guard);
            drop(permit);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt};

    async fn start_server(max_sessions: usize) -> (SocketAddr, broadcast::Sender<()>) {
        let ctx = Arc::new(AdminContext {
            store: Arc::new(AggregateStore::new()),
            stats: Arc::new(ServerStats::new()),
            flush: None,
            config: Arc::new(StatsdConfig {
                admin_max_sessions: max_sessions,
                ..Default::default()
            }),
        });
        let server = AdminServer::bind("127.0.0.1:0".parse().unwrap(), ctx)
            .await
            .unwrap();
        let addr = server.local_addr();
        let (quit_sender, quit_receiver) = broadcast::channel(1);
        tokio::spawn(server.into_running(quit_receiver));
        (addr, quit_sender)
    }

    #[tokio::test]
    async fn help_over_tcp() {
        let (addr, _quit) = start_server(4).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (r, mut w) = stream.into_split();
        let mut r = BufReader::new(r);
        w.write_all(b"help\n").await.unwrap();

        let mut output = String::new();
        loop {
            let mut line = String::new();
            r.read_line(&mut line).await.unwrap();
            output.push_str(&line);
            if line == "END\n" || line.is_empty() {
                break;
            }
        }
        assert!(output.contains("Admin Console"));
        assert!(output.contains("quit"));

        w.write_all(b"quit\n").await.unwrap();
        let mut left = String::new();
        r.read_to_string(&mut left).await.unwrap();
        assert_eq!(left, "Good bye!\n");
    }

    #[tokio::test]
    async fn session_limit() {
        let (addr, _quit) = start_server(1).await;

        let first = TcpStream::connect(addr).await.unwrap();
        let (r1, mut w1) = first.into_split();
        let mut r1 = BufReader::new(r1);
        // make sure the first session is running
        w1.write_all(b"sets\n").await.unwrap();
        let mut line = String::new();
        r1.read_line(&mut line).await.unwrap();
        assert_eq!(line, "END\n");

        let mut second = TcpStream::connect(addr).await.unwrap();
        let mut output = String::new();
        second.read_to_string(&mut output).await.unwrap();
        assert_eq!(output, "ERROR too many admin sessions\n");
    }

    #[tokio::test]
    async fn shutdown_closes_sessions() {
        let (addr, quit) = start_server(4).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"sets\n").await.unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"END\n");

        quit.send(()).unwrap();
        let mut left = Vec::new();
        let r = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            stream.read_to_end(&mut left),
        )
        .await;
        assert!(r.is_ok());
    }
}
