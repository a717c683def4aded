/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use anyhow::Context;
use slog::{Drain, slog_o};
use slog_scope::GlobalLoggerGuard;

use statsd_stdlog::{LogStats, StdLogConfig};

const PROCESS_LOG_THREAD_NAME: &str = "log-process";

/// Install the process logger.
///
/// The returned guard must be held until exit. The stats report records lost
/// by the stderr drain.
pub fn setup(verbose_level: u8) -> anyhow::Result<(GlobalLoggerGuard, Arc<LogStats>)> {
    let log_conf = StdLogConfig::with_name(PROCESS_LOG_THREAD_NAME);
    let drain = statsd_stdlog::new_async_logger(&log_conf)
        .context("failed to start the stderr log thread")?;
    let log_stats = drain.stats();
    let logger = slog::Logger::root(drain.fuse(), slog_o!());

    let scope_guard = slog_scope::set_global_logger(logger);

    slog_stdlog::init_with_level(log_level(verbose_level))
        .context("failed to set the global logger")?;
    Ok((scope_guard, log_stats))
}

fn log_level(verbose_level: u8) -> log::Level {
    match verbose_level {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    }
}
