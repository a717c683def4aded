/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod name;
pub use name::{MetricName, MetricNameError};

mod value;
pub(crate) use value::parse_number;
pub use value::{GaugeValue, MetricValue, format_number};

/// A single parsed sample, consumed by the aggregate store right away.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricRecord {
    pub name: MetricName,
    pub value: MetricValue,
}

impl MetricRecord {
    pub fn new(name: MetricName, value: MetricValue) -> Self {
        MetricRecord { name, value }
    }
}
