/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::anyhow;

pub const DEFAULT_PORT: u16 = 8125;
pub const DEFAULT_ADMIN_PORT: u16 = 8126;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_ADMIN_MAX_SESSIONS: usize = 64;
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatsdConfig {
    pub listen: SocketAddr,
    pub admin_listen: SocketAddr,
    pub console: bool,
    pub flush_interval: Duration,
    pub manual_flush: bool,
    pub relative_gauges: bool,
    pub admin_max_sessions: usize,
    pub shutdown_grace: Duration,
}

impl Default for StatsdConfig {
    fn default() -> Self {
        StatsdConfig {
            listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            admin_listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_ADMIN_PORT),
            console: false,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            manual_flush: false,
            relative_gauges: false,
            admin_max_sessions: DEFAULT_ADMIN_MAX_SESSIONS,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl StatsdConfig {
    pub fn check(&self) -> anyhow::Result<()> {
        if self.flush_interval < Duration::from_secs(1) {
            return Err(anyhow!(
                "flush interval should be at least 1s, got {:?}",
                self.flush_interval
            ));
        }
        if self.admin_max_sessions == 0 {
            return Err(anyhow!("admin max sessions should not be 0"));
        }
        Ok(())
    }

    /// The period of the flush timer, or None if flushes are only manual.
    pub fn flush_period(&self) -> Option<Duration> {
        if self.manual_flush {
            None
        } else {
            Some(self.flush_interval)
        }
    }
}
