/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use ahash::{AHashMap, AHashSet};
use chrono::Utc;

use crate::types::{MetricName, MetricRecord, MetricValue};

mod snapshot;
pub use snapshot::{CounterSnapshot, FlushSnapshot, TimerSummary};

#[derive(Default)]
struct IntervalBuckets {
    counters: AHashMap<MetricName, f64>,
    timers: AHashMap<MetricName, Vec<f64>>,
    sets: AHashMap<MetricName, AHashSet<Arc<str>>>,
}

struct Buckets {
    interval: IntervalBuckets,
    counter_totals: AHashMap<MetricName, f64>,
    gauges: AHashMap<MetricName, f64>,
    last_reset: Instant,
}

impl Buckets {
    fn counters(&self) -> BTreeMap<MetricName, CounterSnapshot> {
        self.interval
            .counters
            .iter()
            .map(|(name, value)| {
                let lifetime = self.counter_totals.get(name).copied().unwrap_or(*value);
                (
                    name.clone(),
                    CounterSnapshot {
                        value: *value,
                        lifetime,
                    },
                )
            })
            .collect()
    }

    fn set_sizes(&self) -> BTreeMap<MetricName, usize> {
        self.interval
            .sets
            .iter()
            .map(|(name, members)| (name.clone(), members.len()))
            .collect()
    }
}

fn summarize_timers(
    timers: AHashMap<MetricName, Vec<f64>>,
) -> BTreeMap<MetricName, TimerSummary> {
    timers
        .into_iter()
        .filter_map(|(name, mut values)| {
            TimerSummary::from_values(&mut values).map(|summary| (name, summary))
        })
        .collect()
}

/// The shared aggregation state of the daemon.
///
/// Every method holds the inner lock only for in-memory work. Timer values
/// are sorted and summarized after the lock is released.
pub struct AggregateStore {
    inner: Mutex<Buckets>,
}

impl Default for AggregateStore {
    fn default() -> Self {
        AggregateStore::new()
    }
}

impl AggregateStore {
    pub fn new() -> Self {
        AggregateStore {
            inner: Mutex::new(Buckets {
                interval: IntervalBuckets::default(),
                counter_totals: AHashMap::new(),
                gauges: AHashMap::new(),
                last_reset: Instant::now(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Buckets> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn apply(&self, record: MetricRecord) {
        let MetricRecord { name, value } = record;

        let mut buckets = self.lock();
        match value {
            MetricValue::Counter(v) => {
                *buckets.counter_totals.entry(name.clone()).or_default() += v;
                *buckets.interval.counters.entry(name).or_default() += v;
            }
            MetricValue::Timer(v) => {
                buckets.interval.timers.entry(name).or_default().push(v);
            }
            MetricValue::Gauge(g) => {
                let current = buckets.gauges.get(&name).copied();
                buckets.gauges.insert(name, g.apply_to(current));
            }
            MetricValue::Set(member) => {
                buckets.interval.sets.entry(name).or_default().insert(member);
            }
        }
    }

    /// Take the per interval values out of the store and copy the persistent
    /// ones, as one atomic step with respect to `apply`.
    pub fn snapshot_and_reset(&self) -> FlushSnapshot {
        let (interval, counters, gauges, elapsed) = {
            let mut buckets = self.lock();
            let now = Instant::now();
            let elapsed = now.duration_since(buckets.last_reset);
            buckets.last_reset = now;
            let counters = buckets.counters();
            let gauges = buckets.gauges.clone();
            (mem::take(&mut buckets.interval), counters, gauges, elapsed)
        };

        let mut snapshot = FlushSnapshot::new(Utc::now(), elapsed);
        snapshot.counters = counters;
        snapshot.timers = summarize_timers(interval.timers);
        snapshot.gauges.extend(gauges);
        snapshot.sets = interval
            .sets
            .into_iter()
            .map(|(name, members)| (name, members.len()))
            .collect();
        snapshot
    }

    /// Copy the current state without resetting anything.
    pub fn read_only_snapshot(&self) -> FlushSnapshot {
        let (counters, timers, gauges, sets, elapsed) = {
            let buckets = self.lock();
            (
                buckets.counters(),
                buckets.interval.timers.clone(),
                buckets.gauges.clone(),
                buckets.set_sizes(),
                buckets.last_reset.elapsed(),
            )
        };

        let mut snapshot = FlushSnapshot::new(Utc::now(), elapsed);
        snapshot.counters = counters;
        snapshot.timers = summarize_timers(timers);
        snapshot.gauges.extend(gauges);
        snapshot.sets = sets;
        snapshot
    }

    pub fn read_counters(&self) -> BTreeMap<MetricName, CounterSnapshot> {
        self.lock().counters()
    }

    pub fn read_timers(&self) -> BTreeMap<MetricName, TimerSummary> {
        let timers = self.lock().interval.timers.clone();
        summarize_timers(timers)
    }

    pub fn read_gauges(&self) -> BTreeMap<MetricName, f64> {
        let buckets = self.lock();
        buckets
            .gauges
            .iter()
            .map(|(name, v)| (name.clone(), *v))
            .collect()
    }

    pub fn read_sets(&self) -> BTreeMap<MetricName, usize> {
        self.lock().set_sizes()
    }

    /// Number of entries visible to the next flush.
    pub fn len(&self) -> usize {
        let buckets = self.lock();
        buckets.interval.counters.len()
            + buckets.interval.timers.len()
            + buckets.interval.sets.len()
            + buckets.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::thread;

    use crate::types::GaugeValue;

    fn record(name: &str, value: MetricValue) -> MetricRecord {
        MetricRecord::new(MetricName::from_str(name).unwrap(), value)
    }

    #[test]
    fn counter_sum_and_reset() {
        let store = AggregateStore::new();
        for _ in 0..10 {
            store.apply(record("c", MetricValue::Counter(1.5)));
        }

        let snap = store.snapshot_and_reset();
        let c = snap.counters.get("c").unwrap();
        assert_eq!(c.value, 15.0);
        assert_eq!(c.lifetime, 15.0);

        let snap = store.snapshot_and_reset();
        assert!(snap.counters.is_empty());
        assert!(store.is_empty());

        store.apply(record("c", MetricValue::Counter(2.0)));
        let snap = store.snapshot_and_reset();
        let c = snap.counters.get("c").unwrap();
        assert_eq!(c.value, 2.0);
        assert_eq!(c.lifetime, 17.0);
    }

    #[test]
    fn gauge_persists() {
        let store = AggregateStore::new();
        for v in [3.0, 9.0, 4.0] {
            store.apply(record("g", MetricValue::Gauge(GaugeValue::Absolute(v))));
            let snap = store.read_only_snapshot();
            assert_eq!(snap.gauges.get("g"), Some(&v));
        }

        let snap = store.snapshot_and_reset();
        assert_eq!(snap.gauges.get("g"), Some(&4.0));
        let snap = store.snapshot_and_reset();
        assert_eq!(snap.gauges.get("g"), Some(&4.0));

        store.apply(record("g", MetricValue::Gauge(GaugeValue::Delta(-1.5))));
        let snap = store.snapshot_and_reset();
        assert_eq!(snap.gauges.get("g"), Some(&2.5));
    }

    #[test]
    fn same_name_different_kind() {
        let store = AggregateStore::new();
        store.apply(record("x", MetricValue::Counter(1.0)));
        store.apply(record("x", MetricValue::Gauge(GaugeValue::Absolute(7.0))));
        assert_eq!(store.len(), 2);

        let snap = store.snapshot_and_reset();
        assert_eq!(snap.counters.get("x").unwrap().value, 1.0);
        assert_eq!(snap.gauges.get("x"), Some(&7.0));
    }

    #[test]
    fn timers_and_sets() {
        let store = AggregateStore::new();
        for v in [3.4, 12.1, 13.1, 33.7] {
            store.apply(record("t", MetricValue::Timer(v)));
        }
        for m in ["a", "b", "a", "c"] {
            store.apply(record("s", MetricValue::Set(Arc::from(m))));
        }

        let snap = store.snapshot_and_reset();
        let t = snap.timers.get("t").unwrap();
        assert_eq!(t.count, 4);
        assert!((t.median - 12.6).abs() < 1e-9);
        assert_eq!(snap.sets.get("s"), Some(&3));

        let snap = store.snapshot_and_reset();
        assert!(snap.timers.is_empty());
        assert!(snap.sets.is_empty());
    }

    #[test]
    fn read_only_does_not_reset() {
        let store = AggregateStore::new();
        store.apply(record("c", MetricValue::Counter(1.0)));

        let s1 = store.read_only_snapshot();
        let s2 = store.read_only_snapshot();
        assert_eq!(s1.counters, s2.counters);

        let snap = store.snapshot_and_reset();
        assert_eq!(snap.counters.get("c").unwrap().value, 1.0);
    }

    #[test]
    fn concurrent_flush() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 20_000;

        let store = Arc::new(AggregateStore::new());
        let mut handles = Vec::new();
        for _ in 0..THREADS {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..PER_THREAD {
                    store.apply(record("c", MetricValue::Counter(1.0)));
                }
            }));
        }

        let mut total = 0.0;
        while handles.iter().any(|h| !h.is_finished()) {
            let snap = store.snapshot_and_reset();
            if let Some(c) = snap.counters.get("c") {
                total += c.value;
            }
            thread::yield_now();
        }
        for h in handles {
            h.join().unwrap();
        }
        let snap = store.snapshot_and_reset();
        if let Some(c) = snap.counters.get("c") {
            total += c.value;
            assert_eq!(c.lifetime, (THREADS * PER_THREAD) as f64);
        }

        assert_eq!(total, (THREADS * PER_THREAD) as f64);
    }

    #[test]
    fn per_kind_reads() {
        let store = AggregateStore::new();
        store.apply(record("c", MetricValue::Counter(2.0)));
        store.apply(record("t", MetricValue::Timer(5.0)));
        store.apply(record("t", MetricValue::Timer(1.0)));
        store.apply(record("g", MetricValue::Gauge(GaugeValue::Absolute(8.0))));
        store.apply(record("s", MetricValue::Set(Arc::from("m"))));

        let full = store.read_only_snapshot();
        assert_eq!(store.read_counters(), full.counters);
        assert_eq!(store.read_timers(), full.timers);
        assert_eq!(store.read_gauges(), full.gauges);
        assert_eq!(store.read_sets(), full.sets);
        assert_eq!(store.read_timers().get("t").unwrap().median, 3.0);
        assert_eq!(store.len(), 4);
    }
}
