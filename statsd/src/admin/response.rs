/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::fmt::Write;

use super::command::COMMAND_TABLE;
use crate::collect::{CounterSnapshot, TimerSummary};
use crate::config::StatsdConfig;
use crate::stat::ServerSnapshot;
use crate::types::{MetricName, format_number};

const END: &str = "END\n";

pub(super) fn help() -> String {
    let width = COMMAND_TABLE
        .iter()
        .map(|(n, _, _)| n.len())
        .max()
        .unwrap_or_default();

    let mut s = String::with_capacity(512);
    s.push_str("Statsd Admin Console:\n\n");
    s.push_str("Available commands:\n");
    for (name, _, desc) in COMMAND_TABLE {
        let _ = writeln!(s, "{name:<width$} - {desc}");
    }
    s.push_str(END);
    s
}

pub(super) fn stats(snapshot: &ServerSnapshot, config: &StatsdConfig) -> String {
    let mut s = String::with_capacity(256);
    let _ = writeln!(s, "uptime: {}", snapshot.uptime.as_secs());
    let _ = writeln!(s, "datagrams_received: {}", snapshot.datagrams_received);
    let _ = writeln!(s, "bad_lines: {}", snapshot.bad_lines);
    let _ = writeln!(s, "flushes: {}", snapshot.flushes);
    match config.flush_period() {
        Some(period) => {
            let _ = writeln!(s, "flush_interval: {}", period.as_secs());
        }
        None => s.push_str("flush_interval: manual\n"),
    }
    let _ = writeln!(s, "flush_overruns: {}", snapshot.flush_overruns);
    let _ = writeln!(s, "sink_errors: {}", snapshot.sink_errors);
    let _ = writeln!(s, "admin_sessions: {}", snapshot.admin_sessions);
    let _ = writeln!(s, "admin_refused: {}", snapshot.admin_refused);
    let _ = writeln!(s, "last_flush: {}", snapshot.last_flush);
    let _ = writeln!(s, "log_dropped: {}", snapshot.log_dropped);
    let _ = writeln!(s, "log_io_failed: {}", snapshot.log_io_failed);
    s.push_str(END);
    s
}

pub(super) fn counters(counters: &BTreeMap<MetricName, CounterSnapshot>) -> String {
    let mut s = String::new();
    for (name, c) in counters {
        let _ = writeln!(s, "{name}: {}", format_number(c.value));
    }
    s.push_str(END);
    s
}

pub(super) fn timers(timers: &BTreeMap<MetricName, TimerSummary>) -> String {
    let mut s = String::new();
    for (name, t) in timers {
        let _ = writeln!(
            s,
            "{name}: count={} mean={} min={} max={} median={} p90={} sum={}",
            t.count,
            format_number(t.mean),
            format_number(t.min),
            format_number(t.max),
            format_number(t.median),
            format_number(t.p90),
            format_number(t.sum),
        );
    }
    s.push_str(END);
    s
}

pub(super) fn gauges(gauges: &BTreeMap<MetricName, f64>) -> String {
    let mut s = String::new();
    for (name, v) in gauges {
        let _ = writeln!(s, "{name}: {}", format_number(*v));
    }
    s.push_str(END);
    s
}

pub(super) fn sets(sets: &BTreeMap<MetricName, usize>) -> String {
    let mut s = String::new();
    for (name, n) in sets {
        let _ = writeln!(s, "{name}: {n}");
    }
    s.push_str(END);
    s
}
