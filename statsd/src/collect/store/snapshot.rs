/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::stat::ServerStats;
use crate::types::MetricName;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CounterSnapshot {
    /// Sum since the previous reset.
    pub value: f64,
    /// Sum since the daemon started.
    pub lifetime: f64,
}

impl CounterSnapshot {
    /// Per second rate over the given interval.
    pub fn rate(&self, interval: Duration) -> f64 {
        let secs = interval.as_secs_f64();
        if secs > 0.0 { self.value / secs } else { 0.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimerSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub sum: f64,
    pub p90: f64,
}

impl TimerSummary {
    /// Summarize the observed values, which will be sorted in place.
    ///
    /// Returns None if there is no value.
    pub fn from_values(values: &mut [f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_unstable_by(f64::total_cmp);

        let count = values.len();
        let sum: f64 = values.iter().sum();
        let median = if count % 2 == 0 {
            (values[count / 2 - 1] + values[count / 2]) / 2.0
        } else {
            values[count / 2]
        };
        // nearest rank
        let p90_rank = (count * 9).div_ceil(10);
        let p90 = values[p90_rank.max(1) - 1];

        Some(TimerSummary {
            count,
            mean: sum / count as f64,
            min: values[0],
            max: values[count - 1],
            median,
            sum,
            p90,
        })
    }
}

/// An immutable copy of the aggregate store taken at one instant.
#[derive(Clone, Debug)]
pub struct FlushSnapshot {
    pub time: DateTime<Utc>,
    /// Elapsed time since the previous reset of the store.
    pub interval: Duration,
    pub counters: BTreeMap<MetricName, CounterSnapshot>,
    pub timers: BTreeMap<MetricName, TimerSummary>,
    pub gauges: BTreeMap<MetricName, f64>,
    pub sets: BTreeMap<MetricName, usize>,
    pub bad_lines: u64,
    pub total_datagrams: u64,
}

impl FlushSnapshot {
    pub(super) fn new(time: DateTime<Utc>, interval: Duration) -> Self {
        FlushSnapshot {
            time,
            interval,
            counters: BTreeMap::new(),
            timers: BTreeMap::new(),
            gauges: BTreeMap::new(),
            sets: BTreeMap::new(),
            bad_lines: 0,
            total_datagrams: 0,
        }
    }

    /// Attach the ingestion totals of the server.
    pub fn with_ingest(mut self, stats: &ServerStats) -> Self {
        self.bad_lines = stats.bad_lines();
        self.total_datagrams = stats.datagrams_received();
        self
    }
}
