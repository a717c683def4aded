/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LogSnapshot {
    /// Records handed to the drain.
    pub total: u64,
    /// Records lost before reaching the IO thread.
    pub dropped: u64,
    /// Records the IO thread failed to write to stderr.
    pub io_failed: u64,
}

/// Loss counters of the stderr drain, shared with the IO thread.
#[derive(Debug, Default)]
pub struct LogStats {
    total: AtomicU64,
    dropped: AtomicU64,
    io_failed: AtomicU64,
}

impl LogStats {
    pub fn snapshot(&self) -> LogSnapshot {
        LogSnapshot {
            total: self.total.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            io_failed: self.io_failed.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn add_total(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_io_failed(&self) {
        self.io_failed.fetch_add(1, Ordering::Relaxed);
    }
}
