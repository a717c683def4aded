/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::admin::{AdminContext, AdminServer};
use crate::collect::AggregateStore;
use crate::config::StatsdConfig;
use crate::export::ArcSink;
use crate::flush::FlushScheduler;
use crate::import::StatsdImporter;
use crate::stat::ServerStats;

/// All running units of the daemon.
pub struct Daemon {
    listen_addr: SocketAddr,
    admin_addr: SocketAddr,
    stats: Arc<ServerStats>,
    quit_sender: broadcast::Sender<()>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Daemon {
    /// Bind both endpoints and spawn every unit on the current runtime.
    pub async fn start(config: StatsdConfig, sinks: Vec<ArcSink>) -> anyhow::Result<Self> {
        Daemon::start_with_stats(config, sinks, ServerStats::new()).await
    }

    /// Like `start`, with server stats prepared by the caller.
    pub async fn start_with_stats(
        config: StatsdConfig,
        sinks: Vec<ArcSink>,
        stats: ServerStats,
    ) -> anyhow::Result<Self> {
        config.check()?;
        let config = Arc::new(config);

        let store = Arc::new(AggregateStore::new());
        let stats = Arc::new(stats);

        let importer = StatsdImporter::bind(
            config.listen,
            store.clone(),
            stats.clone(),
            config.relative_gauges,
        )
        .await
        .context("failed to start the statsd importer")?;
        let listen_addr = importer.local_addr();

        let (scheduler, flush) =
            FlushScheduler::new(store.clone(), stats.clone(), sinks, &config);

        let admin_ctx = Arc::new(AdminContext {
            store,
            stats: stats.clone(),
            flush: Some(flush),
            config: config.clone(),
        });
        let admin = AdminServer::bind(config.admin_listen, admin_ctx)
            .await
            .context("failed to start the admin server")?;
        let admin_addr = admin.local_addr();

        let (quit_sender, _) = broadcast::channel(4);
        let tasks = vec![
            ("importer", tokio::spawn(importer.into_running(quit_sender.subscribe()))),
            ("admin", tokio::spawn(admin.into_running(quit_sender.subscribe()))),
            ("flush", tokio::spawn(scheduler.into_running(quit_sender.subscribe()))),
        ];
        info!("statsd listening on udp {listen_addr}, admin on tcp {admin_addr}");

        Ok(Daemon {
            listen_addr,
            admin_addr,
            stats,
            quit_sender,
            tasks,
        })
    }

    #[inline]
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    #[inline]
    pub fn admin_addr(&self) -> SocketAddr {
        self.admin_addr
    }

    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    pub fn quit_sender(&self) -> broadcast::Sender<()> {
        self.quit_sender.clone()
    }

    /// Wait until every unit has stopped.
    pub async fn wait(self) {
        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                warn!("{name} task failed: {e}");
            }
        }
        info!("all units stopped");
    }

    pub async fn shutdown(self) {
        let _ = self.quit_sender.send(());
        self.wait().await;
    }
}
