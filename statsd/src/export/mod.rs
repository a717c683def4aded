/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use crate::collect::FlushSnapshot;
use crate::config::StatsdConfig;

mod console;
pub use console::ConsoleSink;

mod memory;
pub use memory::MemorySink;

/// A consumer of flush snapshots.
///
/// `emit` is called from the blocking thread pool, so it may do blocking IO.
pub trait Sink {
    fn name(&self) -> &str;

    fn emit(&self, snapshot: &FlushSnapshot) -> anyhow::Result<()>;
}

pub type ArcSink = Arc<dyn Sink + Send + Sync>;

/// Build all sinks enabled in the config.
pub fn build_all(config: &StatsdConfig) -> Vec<ArcSink> {
    let mut sinks: Vec<ArcSink> = Vec::new();
    if config.console {
        sinks.push(Arc::new(ConsoleSink::new_stdout()));
    }
    sinks
}
