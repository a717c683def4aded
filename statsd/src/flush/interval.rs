/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// A flush timer that never fires when no period is set.
#[derive(Default)]
pub(super) struct FlushInterval {
    inner: Option<Interval>,
}

impl FlushInterval {
    pub(super) fn new(period: Option<Duration>) -> Self {
        let inner = period.map(|period| {
            // the first tick is one period later, not immediately
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        FlushInterval { inner }
    }

    pub(super) fn period(&self) -> Option<Duration> {
        self.inner.as_ref().map(Interval::period)
    }

    pub(super) async fn tick(&mut self) -> Instant {
        match &mut self.inner {
            Some(interval) => interval.tick().await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn never() {
        let mut f = FlushInterval::default();
        assert!(f.period().is_none());
        let r = tokio::time::timeout(Duration::from_millis(10), f.tick()).await;
        assert!(r.is_err());
    }

    #[tokio::test]
    async fn normal() {
        let period = Duration::from_millis(8);
        let mut f = FlushInterval::new(Some(period));
        assert_eq!(f.period(), Some(period));
        let r = tokio::time::timeout(Duration::from_millis(50), f.tick()).await;
        assert!(r.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn not_immediate() {
        let start = Instant::now();
        let mut f = FlushInterval::new(Some(Duration::from_secs(10)));
        let t = f.tick().await;
        assert!(t - start >= Duration::from_secs(10));
    }
}
