/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use anyhow::Context;
use log::debug;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;

use super::command::AdminCommand;
use super::{AdminContext, AdminError, response};
use crate::flush::{FlushHandle, FlushOutcome};

pub(super) const MAX_LINE_SIZE: usize = 4096;

/// One admin connection.
pub(super) struct AdminSession<R, W> {
    reader: R,
    writer: W,
    ctx: Arc<AdminContext>,
}

impl<R, W> AdminSession<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(super) fn new(reader: R, writer: W, ctx: Arc<AdminContext>) -> Self {
        AdminSession {
            reader,
            writer,
            ctx,
        }
    }

    pub(super) async fn run(mut self, mut quit: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let mut buf = Vec::with_capacity(256);
        loop {
            buf.clear();
            let mut limited_reader = (&mut self.reader).take(MAX_LINE_SIZE as u64 + 1);
            let nr = tokio::select! {
                biased;

                _ = quit.recv() => {
                    debug!("admin session closed by shutdown");
                    break;
                }
                r = limited_reader.read_until(b'\n', &mut buf) => {
                    r.context("failed to read admin command")?
                }
            };
            if nr == 0 {
                break;
            }

            if !buf.ends_with(b"\n") && buf.len() > MAX_LINE_SIZE {
                self.write_error(AdminError::LineTooLong).await?;
                break;
            }

            let Ok(line) = std::str::from_utf8(&buf) else {
                self.write_error(AdminError::InvalidUtf8).await?;
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if !self.handle_line(line).await? {
                break;
            }
        }

        self.writer.shutdown().await.ok();
        Ok(())
    }

    /// Returns false if the session should be closed.
    async fn handle_line(&mut self, line: &str) -> anyhow::Result<bool> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().unwrap_or_default();
        let Some(cmd) = AdminCommand::lookup(name) else {
            self.write_error(AdminError::UnknownCommand(name.to_string()))
                .await?;
            return Ok(true);
        };
        if tokens.next().is_some() {
            self.write_error(AdminError::UnexpectedArgument(cmd.name()))
                .await?;
            return Ok(true);
        }

        let text = match cmd {
            AdminCommand::Help => response::help(),
            AdminCommand::Stats => response::stats(&self.ctx.stats.snapshot(), &self.ctx.config),
            AdminCommand::Counters => response::counters(&self.ctx.store.read_counters()),
            AdminCommand::Timers => response::timers(&self.ctx.store.read_timers()),
            AdminCommand::Gauges => response::gauges(&self.ctx.store.read_gauges()),
            AdminCommand::Sets => response::sets(&self.ctx.store.read_sets()),
            AdminCommand::Flush => flush(self.ctx.flush.as_ref()).await,
            AdminCommand::Quit => {
                self.write_all(b"Good bye!\n").await?;
                return Ok(false);
            }
        };
        self.write_all(text.as_bytes()).await?;
        Ok(true)
    }

    async fn write_error(&mut self, e: AdminError) -> anyhow::Result<()> {
        let msg = format!("ERROR {e}\n");
        self.write_all(msg.as_bytes()).await
    }

    async fn write_all(&mut self, buf: &[u8]) -> anyhow::Result<()> {
        self.writer
            .write_all(buf)
            .await
            .context("failed to write admin response")?;
        self.writer
            .flush()
            .await
            .context("failed to flush admin response")
    }
}

async fn flush(handle: Option<&FlushHandle>) -> String {
    let Some(handle) = handle else {
        return format!("ERROR {}\n", AdminError::FlushUnavailable);
    };
    match handle.trigger().await {
        Ok(FlushOutcome::Started) => "OK flush started\n".to_string(),
        Ok(FlushOutcome::Skipped) => format!("ERROR {}\n", AdminError::FlushInProgress),
        Err(e) => {
            debug!("admin flush request failed: {e}");
            format!("ERROR {}\n", AdminError::FlushUnavailable)
        }
    }
}
