/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;

use super::StatsdParseError;
use crate::types::{GaugeValue, MetricName, MetricRecord, MetricValue, parse_number};

/// Parser for a single `name:value|type[|@sample_rate]` line.
pub(super) struct LineParser<'a> {
    line: &'a [u8],
    relative_gauges: bool,
}

impl<'a> LineParser<'a> {
    pub(super) fn new(line: &'a [u8], relative_gauges: bool) -> Self {
        LineParser {
            line,
            relative_gauges,
        }
    }

    pub(super) fn parse(self) -> Result<MetricRecord, StatsdParseError> {
        let line = std::str::from_utf8(self.line).map_err(StatsdParseError::InvalidUtf8)?;

        let Some((name, left)) = line.split_once(':') else {
            return if line.is_empty() {
                Err(StatsdParseError::NoName)
            } else {
                Err(StatsdParseError::NoValue)
            };
        };
        if name.is_empty() {
            return Err(StatsdParseError::NoName);
        }
        let name =
            MetricName::from_str(name).map_err(|e| StatsdParseError::InvalidName(e.into()))?;

        let Some((value, left)) = left.split_once('|') else {
            return if left.is_empty() {
                Err(StatsdParseError::NoValue)
            } else {
                Err(StatsdParseError::NoType)
            };
        };
        if value.is_empty() {
            return Err(StatsdParseError::NoValue);
        }

        let mut fields = left.split('|');
        let r#type = fields.next().unwrap_or_default();
        if r#type.is_empty() {
            return Err(StatsdParseError::NoType);
        }

        let mut sample_rate = 1.0;
        for field in fields {
            match field.strip_prefix('@') {
                Some(rate) => sample_rate = parse_sample_rate(rate)?,
                None => return Err(StatsdParseError::UnsupportedField),
            }
        }

        let value = match r#type {
            "c" => {
                let v = parse_number(value).map_err(StatsdParseError::InvalidValue)?;
                MetricValue::Counter(v / sample_rate)
            }
            "ms" => {
                let v = parse_number(value).map_err(StatsdParseError::InvalidValue)?;
                MetricValue::Timer(v)
            }
            "g" => MetricValue::Gauge(self.parse_gauge(value)?),
            "s" => MetricValue::Set(Arc::from(value)),
            _ => return Err(StatsdParseError::UnsupportedType),
        };

        Ok(MetricRecord::new(name, value))
    }

    fn parse_gauge(&self, value: &str) -> Result<GaugeValue, StatsdParseError> {
        let v = parse_number(value).map_err(StatsdParseError::InvalidValue)?;
        if self.relative_gauges && (value.starts_with('+') || value.starts_with('-')) {
            Ok(GaugeValue::Delta(v))
        } else {
            Ok(GaugeValue::Absolute(v))
        }
    }
}

fn parse_sample_rate(s: &str) -> Result<f64, StatsdParseError> {
    let rate = parse_number(s).map_err(StatsdParseError::InvalidSampleRate)?;
    if rate <= 0.0 {
        return Err(StatsdParseError::InvalidSampleRate(anyhow!(
            "sample rate {rate} is not positive"
        )));
    }
    Ok(rate)
}
