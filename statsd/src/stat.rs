/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicIsize, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use statsd_stdlog::LogStats;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerSnapshot {
    pub uptime: Duration,
    pub datagrams_received: u64,
    pub bad_lines: u64,
    pub flushes: u64,
    pub flush_overruns: u64,
    pub sink_errors: u64,
    pub admin_sessions: isize,
    pub admin_refused: u64,
    pub last_flush: i64,
    pub log_dropped: u64,
    pub log_io_failed: u64,
}

/// Process level counters shared by the listener, the flush scheduler and
/// the admin server.
#[derive(Debug)]
pub struct ServerStats {
    start: Instant,

    datagrams_received: AtomicU64,
    bad_lines: AtomicU64,
    flushes: AtomicU64,
    flush_overruns: AtomicU64,
    sink_errors: AtomicU64,
    admin_sessions: AtomicIsize,
    admin_refused: AtomicU64,
    last_flush: AtomicI64,

    log: Option<Arc<LogStats>>,
}

impl Default for ServerStats {
    fn default() -> Self {
        ServerStats::new()
    }
}

impl ServerStats {
    pub fn new() -> Self {
        ServerStats {
            start: Instant::now(),
            datagrams_received: AtomicU64::new(0),
            bad_lines: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            flush_overruns: AtomicU64::new(0),
            sink_errors: AtomicU64::new(0),
            admin_sessions: AtomicIsize::new(0),
            admin_refused: AtomicU64::new(0),
            last_flush: AtomicI64::new(0),
            log: None,
        }
    }

    /// Also report the loss counters of the process logger.
    pub fn with_log_stats(mut self, log: Arc<LogStats>) -> Self {
        self.log = Some(log);
        self
    }

    #[inline]
    pub fn uptime(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn add_datagram(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }
    pub fn datagrams_received(&self) -> u64 {
        self.datagrams_received.load(Ordering::Relaxed)
    }

    pub fn add_bad_lines(&self, n: u64) {
        self.bad_lines.fetch_add(n, Ordering::Relaxed);
    }
    pub fn bad_lines(&self) -> u64 {
        self.bad_lines.load(Ordering::Relaxed)
    }

    /// Record a completed drain at the given unix timestamp.
    pub fn add_flush(&self, unix_ts: i64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.last_flush.store(unix_ts, Ordering::Relaxed);
    }
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn add_flush_overrun(&self) {
        self.flush_overruns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_sink_error(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
    }
    pub fn sink_errors(&self) -> u64 {
        self.sink_errors.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn add_admin_session(self: &Arc<Self>) -> AdminSessionGuard {
        self.admin_sessions.fetch_add(1, Ordering::Relaxed);
        AdminSessionGuard(self.clone())
    }

    pub fn add_admin_refused(&self) {
        self.admin_refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServerSnapshot {
        let log = self
            .log
            .as_ref()
            .map(|log| log.snapshot())
            .unwrap_or_default();
        ServerSnapshot {
            uptime: self.uptime(),
            datagrams_received: self.datagrams_received(),
            bad_lines: self.bad_lines(),
            flushes: self.flushes(),
            flush_overruns: self.flush_overruns.load(Ordering::Relaxed),
            sink_errors: self.sink_errors(),
            admin_sessions: self.admin_sessions.load(Ordering::Relaxed),
            admin_refused: self.admin_refused.load(Ordering::Relaxed),
            last_flush: self.last_flush.load(Ordering::Relaxed),
            log_dropped: log.dropped,
            log_io_failed: log.io_failed,
        }
    }
}

pub struct AdminSessionGuard(Arc<ServerStats>);

impl Drop for AdminSessionGuard {
    fn drop(&mut self) {
        self.0.admin_sessions.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters() {
        let stats = ServerStats::new();
        stats.add_datagram();
        stats.add_datagram();
        stats.add_bad_lines(3);
        stats.add_flush(1760000000);
        stats.add_flush_overrun();
        stats.add_sink_error();

        let snap = stats.snapshot();
        assert_eq!(snap.datagrams_received, 2);
        assert_eq!(snap.bad_lines, 3);
        assert_eq!(snap.flushes, 1);
        assert_eq!(snap.flush_overruns, 1);
        assert_eq!(snap.sink_errors, 1);
        assert_eq!(snap.last_flush, 1760000000);
    }

    #[test]
    fn admin_session_guard() {
        let stats = Arc::new(ServerStats::new());
        let g1 = stats.add_admin_session();
        let g2 = stats.add_admin_session();
        assert_eq!(stats.snapshot().admin_sessions, 2);
        drop(g1);
        assert_eq!(stats.snapshot().admin_sessions, 1);
        drop(g2);
        assert_eq!(stats.snapshot().admin_sessions, 0);

        stats.add_admin_refused();
        assert_eq!(stats.snapshot().admin_refused, 1);
    }

    #[test]
    fn log_stats() {
        let stats = ServerStats::new();
        assert_eq!(stats.snapshot().log_dropped, 0);

        let stats = ServerStats::new().with_log_stats(Arc::new(LogStats::default()));
        let snap = stats.snapshot();
        assert_eq!(snap.log_dropped, 0);
        assert_eq!(snap.log_io_failed, 0);
    }
}
