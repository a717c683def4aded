/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use chrono::Local;
use flume::{Receiver, Sender};
use slog::{Drain, Level, OwnedKVList, Record};

mod format;
use format::StdLogFormatter;

mod stats;
pub use stats::{LogSnapshot, LogStats};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Clone, Debug)]
pub struct StdLogConfig {
    pub channel_capacity: usize,
    pub thread_name: String,
    pub append_code_position: bool,
}

impl StdLogConfig {
    pub fn with_name(thread_name: &str) -> Self {
        StdLogConfig {
            channel_capacity: 1024,
            thread_name: thread_name.to_string(),
            append_code_position: true,
        }
    }
}

impl Default for StdLogConfig {
    fn default() -> Self {
        StdLogConfig::with_name("log-stderr")
    }
}

pub struct StdLogValue {
    level: Level,
    message: String,
    kv_pairs: Vec<(String, String)>,
    location: Option<String>,
}

impl StdLogValue {
    fn message_str(&self) -> &str {
        if self.message.is_empty() {
            "()"
        } else {
            &self.message
        }
    }
}

/// A slog drain that never blocks the caller.
///
/// Records are formatted on the calling thread and handed to a dedicated IO
/// thread, which writes them to stderr. Records are dropped and counted
/// when the channel is full. The counters are exposed through `stats()`.
pub struct StdLogDrain {
    sender: Sender<StdLogValue>,
    formatter: StdLogFormatter,
    stats: Arc<LogStats>,
}

impl StdLogDrain {
    pub fn stats(&self) -> Arc<LogStats> {
        Arc::clone(&self.stats)
    }
}

impl Drain for StdLogDrain {
    type Ok = ();
    type Err = slog::Error;

    fn log(&self, record: &Record, logger_values: &OwnedKVList) -> Result<(), slog::Error> {
        self.stats.add_total();

        match self.formatter.format_slog(record, logger_values) {
            Ok(v) => {
                if self.sender.try_send(v).is_err() {
                    // channel full or the IO thread is gone
                    self.stats.add_dropped();
                }
                Ok(())
            }
            Err(e) => {
                self.stats.add_dropped();
                Err(e)
            }
        }
    }
}

pub fn new_async_logger(config: &StdLogConfig) -> io::Result<StdLogDrain> {
    let (sender, receiver) = flume::bounded::<StdLogValue>(config.channel_capacity);

    let stats = Arc::new(LogStats::default());

    let io_thread = AsyncIoThread {
        receiver,
        stats: Arc::clone(&stats),
    };

    let _detached_thread = std::thread::Builder::new()
        .name(config.thread_name.clone())
        .spawn(move || io_thread.run_with_stderr())?;

    Ok(StdLogDrain {
        sender,
        formatter: StdLogFormatter::new(config.append_code_position),
        stats,
    })
}

struct AsyncIoThread {
    receiver: Receiver<StdLogValue>,
    stats: Arc<LogStats>,
}

impl AsyncIoThread {
    fn write_time<IO: Write>(&self, io: &mut IO) -> io::Result<()> {
        let datetime = Local::now();
        write!(io, "{}", datetime.format(TIME_FORMAT))
    }

    fn run_with_stderr(self) {
        let stderr = io::stderr();
        if stderr.is_terminal() {
            self.run(stderr, Self::write_console)
        } else {
            self.run(stderr, Self::write_plain)
        }
    }

    fn run<IO, F>(&self, mut io: IO, write_one: F)
    where
        IO: Write,
        F: Fn(&Self, &mut Vec<u8>, StdLogValue) -> io::Result<()>,
    {
        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        while let Ok(v) = self.receiver.recv() {
            buf.clear();
            let _ = write_one(self, &mut buf, v);
            self.write_buf(&mut io, &buf);

            while let Ok(v) = self.receiver.try_recv() {
                buf.clear();
                let _ = write_one(self, &mut buf, v);
                self.write_buf(&mut io, &buf);
            }

            let _ = io.flush();
        }
    }

    fn write_plain(&self, buf: &mut Vec<u8>, v: StdLogValue) -> io::Result<()> {
        self.write_time(buf)?;
        write!(buf, " {}", v.level)?;
        for (k, v) in &v.kv_pairs {
            write!(buf, " {k}: {v},")?;
        }
        write!(buf, " {}", v.message_str())?;
        if let Some(location) = &v.location {
            write!(buf, " <{location}>")?;
        }
        writeln!(buf)
    }

    fn write_console(&self, buf: &mut Vec<u8>, v: StdLogValue) -> io::Result<()> {
        use anstyle::{AnsiColor, Color, Style};

        const COLOR_MAGENTA: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Magenta)));
        const COLOR_RED: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));
        const COLOR_YELLOW: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)));
        const COLOR_GREEN: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));
        const COLOR_CYAN: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
        const COLOR_BLUE: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue)));
        const STYLE_BOLD: Style = Style::new().bold();
        const STYLE_ITALIC: Style = Style::new().italic();

        let bold_s = STYLE_BOLD.render();
        let bold_e = STYLE_BOLD.render_reset();

        self.write_time(buf)?;
        let level_color = match v.level {
            Level::Critical => COLOR_MAGENTA,
            Level::Error => COLOR_RED,
            Level::Warning => COLOR_YELLOW,
            Level::Info => COLOR_GREEN,
            Level::Debug => COLOR_CYAN,
            Level::Trace => COLOR_BLUE,
        };
        write!(
            buf,
            " {}{}{}",
            level_color.render(),
            v.level,
            level_color.render_reset(),
        )?;

        for (k, v) in &v.kv_pairs {
            write!(buf, " {bold_s}{k}{bold_e}={v},")?;
        }

        write!(buf, " {bold_s}{}{bold_e}", v.message_str())?;

        if let Some(location) = &v.location {
            write!(
                buf,
                " <{}{location}{}>",
                STYLE_ITALIC.render(),
                STYLE_ITALIC.render_reset()
            )?;
        }
        writeln!(buf)
    }

    fn write_buf<IO: Write>(&self, io: &mut IO, buf: &[u8]) {
        if io.write_all(buf).is_err() {
            self.stats.add_io_failed();
        }
    }
}
