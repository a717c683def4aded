/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricNameError {
    #[error("empty name")]
    Empty,
    #[error("invalid char {0:?}")]
    InvalidChar(char),
}

/// Name of a metric, validated to be usable as a key in the line protocol.
///
/// Cloning is cheap, the underlying string is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricName(Arc<str>);

impl MetricName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MetricName {
    type Err = MetricNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(MetricNameError::Empty);
        }
        if let Some(c) = s
            .chars()
            .find(|c| matches!(*c, ':' | '|') || c.is_whitespace() || c.is_control())
        {
            return Err(MetricNameError::InvalidChar(c));
        }
        Ok(MetricName(Arc::from(s)))
    }
}

impl Borrow<str> for MetricName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
