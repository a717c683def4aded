/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::Sink;
use crate::collect::FlushSnapshot;

/// Keep the most recent flush snapshots in memory, newest first.
pub struct MemorySink {
    store_count: usize,
    inner: Mutex<VecDeque<FlushSnapshot>>,
}

impl MemorySink {
    pub fn new(store_count: usize) -> Self {
        MemorySink {
            store_count: store_count.max(1),
            inner: Mutex::new(VecDeque::with_capacity(store_count)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<FlushSnapshot>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn latest(&self) -> Option<FlushSnapshot> {
        self.lock().front().cloned()
    }

    pub fn all(&self) -> Vec<FlushSnapshot> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn emit(&self, snapshot: &FlushSnapshot) -> anyhow::Result<()> {
        let mut queue = self.lock();
        queue.push_front(snapshot.clone());
        queue.truncate(self.store_count);
        Ok(())
    }
}
