/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::Utf8Error;

use thiserror::Error;

use crate::types::MetricRecord;

mod line;
use line::LineParser;

#[derive(Debug, Error)]
pub enum StatsdParseError {
    #[error("no name field")]
    NoName,
    #[error("invalid name field: {0}")]
    InvalidName(anyhow::Error),
    #[error("no value field")]
    NoValue,
    #[error("invalid value field: {0}")]
    InvalidValue(anyhow::Error),
    #[error("no type field")]
    NoType,
    #[error("unsupported type")]
    UnsupportedType,
    #[error("invalid sample rate field: {0}")]
    InvalidSampleRate(anyhow::Error),
    #[error("unsupported extra field")]
    UnsupportedField,
    #[error("invalid utf-8 line: {0}")]
    InvalidUtf8(Utf8Error),
}

pub struct StatsdRecordVisitor<'a> {
    buf: &'a [u8],
    offset: usize,
    relative_gauges: bool,
}

impl<'a> StatsdRecordVisitor<'a> {
    pub fn new(buf: &'a [u8], relative_gauges: bool) -> Self {
        StatsdRecordVisitor {
            buf,
            offset: 0,
            relative_gauges,
        }
    }

    fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.offset >= self.buf.len() {
            return None;
        }

        let left = &self.buf[self.offset..];
        let line = match memchr::memchr(b'\n', left) {
            Some(p) => {
                self.offset += p + 1;
                &left[..p]
            }
            None => {
                self.offset = self.buf.len();
                left
            }
        };
        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }
}

impl Iterator for StatsdRecordVisitor<'_> {
    type Item = Result<MetricRecord, StatsdParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.next_line()?;
            if line.is_empty() {
                continue;
            }

            return Some(LineParser::new(line, self.relative_gauges).parse());
        }
    }
}
