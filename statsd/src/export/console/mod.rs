/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use anyhow::Context;

use super::Sink;
use crate::collect::FlushSnapshot;
use crate::types::format_number;

/// Print every flush as human readable lines.
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn new_stdout() -> Self {
        ConsoleSink::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        ConsoleSink {
            writer: Mutex::new(writer),
        }
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn emit(&self, snapshot: &FlushSnapshot) -> anyhow::Result<()> {
        let mut buf = Vec::with_capacity(4096);
        format_snapshot(&mut buf, snapshot)?;

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer
            .write_all(&buf)
            .context("failed to write to console")?;
        writer.flush().context("failed to flush console")
    }
}

fn format_snapshot(buf: &mut Vec<u8>, snapshot: &FlushSnapshot) -> io::Result<()> {
    let ts = snapshot.time.timestamp();

    writeln!(
        buf,
        "Flushing metrics: {} (interval {:.3}s)",
        snapshot.time.to_rfc2822(),
        snapshot.interval.as_secs_f64()
    )?;
    writeln!(buf, "  bad_lines: {}", snapshot.bad_lines)?;
    writeln!(buf, "  total_datagrams: {}", snapshot.total_datagrams)?;

    writeln!(buf, "  counters:")?;
    for (name, c) in &snapshot.counters {
        writeln!(
            buf,
            "    {name}: {} rate={}/s lifetime={} ts={ts}",
            format_number(c.value),
            format_number(c.rate(snapshot.interval)),
            format_number(c.lifetime),
        )?;
    }

    writeln!(buf, "  gauges:")?;
    for (name, v) in &snapshot.gauges {
        writeln!(buf, "    {name}: {} ts={ts}", format_number(*v))?;
    }

    writeln!(buf, "  timers:")?;
    for (name, t) in &snapshot.timers {
        writeln!(
            buf,
            "    {name}: count={} mean={} min={} max={} median={} p90={} sum={} ts={ts}",
            t.count,
            format_number(t.mean),
            format_number(t.min),
            format_number(t.max),
            format_number(t.median),
            format_number(t.p90),
            format_number(t.sum),
        )?;
    }

    writeln!(buf, "  sets:")?;
    for (name, n) in &snapshot.sets {
        writeln!(buf, "    {name}: {n} ts={ts}")?;
    }
    Ok(())
}
