/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use log::{debug, error, info, warn};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::collect::{AggregateStore, FlushSnapshot};
use crate::config::StatsdConfig;
use crate::export::ArcSink;
use crate::stat::ServerStats;

mod interval;
use interval::FlushInterval;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    Started,
    /// The previous emit is still running, nothing was drained.
    Skipped,
}

type FlushRequest = oneshot::Sender<FlushOutcome>;

/// Request flushes from outside of the scheduler task.
#[derive(Clone)]
pub struct FlushHandle {
    sender: mpsc::Sender<FlushRequest>,
}

impl FlushHandle {
    pub async fn trigger(&self) -> anyhow::Result<FlushOutcome> {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(sender)
            .await
            .map_err(|_| anyhow!("flush scheduler is not running"))?;
        receiver
            .await
            .map_err(|_| anyhow!("flush scheduler dropped the request"))
    }
}

pub struct FlushScheduler {
    store: Arc<AggregateStore>,
    stats: Arc<ServerStats>,
    sinks: Arc<[ArcSink]>,
    period: Option<Duration>,
    shutdown_grace: Duration,
    req_receiver: Option<mpsc::Receiver<FlushRequest>>,
    emitting: Option<JoinHandle<()>>,
}

impl FlushScheduler {
    pub fn new(
        store: Arc<AggregateStore>,
        stats: Arc<ServerStats>,
        sinks: Vec<ArcSink>,
        config: &StatsdConfig,
    ) -> (Self, FlushHandle) {
        let (sender, receiver) = mpsc::channel(4);
        let scheduler = FlushScheduler {
            store,
            stats,
            sinks: Arc::from(sinks),
            period: config.flush_period(),
            shutdown_grace: config.shutdown_grace,
            req_receiver: Some(receiver),
            emitting: None,
        };
        (scheduler, FlushHandle { sender })
    }

    pub async fn into_running(mut self, mut quit: broadcast::Receiver<()>) {
        let mut interval = FlushInterval::new(self.period);
        match interval.period() {
            Some(period) => info!("started flush scheduler with interval {period:?}"),
            None => info!("started flush scheduler in manual mode"),
        }

        loop {
            tokio::select! {
                biased;

                _ = quit.recv() => {
                    info!("flush scheduler will go offline");
                    break;
                }
                _ = interval.tick() => {
                    self.flush();
                }
                r = recv_request(&mut self.req_receiver) => {
                    match r {
                        Some(reply) => {
                            let outcome = self.flush();
                            let _ = reply.send(outcome);
                        }
                        None => {
                            debug!("all flush handles are dropped");
                            self.req_receiver = None;
                        }
                    }
                }
            }
        }

        self.shutdown().await;
        info!("stopped flush scheduler");
    }

    fn flush(&mut self) -> FlushOutcome {
        if let Some(handle) = &self.emitting
            && !handle.is_finished()
        {
            warn!("flush overrun: the previous emit is still running, skip this flush");
            self.stats.add_flush_overrun();
            return FlushOutcome::Skipped;
        }

        self.emitting = self.drain_and_emit();
        FlushOutcome::Started
    }

    /// Returns the emit task, or None if there is no sink to emit to.
    fn drain_and_emit(&self) -> Option<JoinHandle<()>> {
        let snapshot = self.store.snapshot_and_reset().with_ingest(&self.stats);
        self.stats.add_flush(snapshot.time.timestamp());
        debug!(
            "drained {} counters, {} timers, {} gauges, {} sets",
            snapshot.counters.len(),
            snapshot.timers.len(),
            snapshot.gauges.len(),
            snapshot.sets.len()
        );

        if self.sinks.is_empty() {
            return None;
        }
        let sinks = self.sinks.clone();
        let stats = self.stats.clone();
        Some(tokio::task::spawn_blocking(move || emit_all(&sinks, &snapshot, &stats)))
    }

    async fn shutdown(mut self) {
        // no more requests
        self.req_receiver = None;

        let deadline = Instant::now() + self.shutdown_grace;
        if let Some(handle) = self.emitting.take()
            && !wait_emit(deadline, handle).await
        {
            warn!("timed out waiting for the in-flight emit, skip the final flush");
            return;
        }

        if let Some(handle) = self.drain_and_emit()
            && !wait_emit(deadline, handle).await
        {
            warn!("timed out waiting for the final flush");
        }
    }
}

async fn recv_request(
    receiver: &mut Option<mpsc::Receiver<FlushRequest>>,
) -> Option<FlushRequest> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

/// Returns false if the deadline is reached.
async fn wait_emit(deadline: Instant, handle: JoinHandle<()>) -> bool {
    match tokio::time::timeout_at(deadline, handle).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!("emit task failed: {e}");
            true
        }
        Err(_) => false,
    }
}

fn emit_all(sinks: &[ArcSink], snapshot: &FlushSnapshot, stats: &ServerStats) {
    for sink in sinks {
        match panic::catch_unwind(AssertUnwindSafe(|| sink.emit(snapshot))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("sink {} failed to emit: {e:?}", sink.name());
                stats.add_sink_error();
            }
            Err(_) => {
                error!("sink {} panicked while emitting", sink.name());
                stats.add_sink_error();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::export::{MemorySink, Sink};
    use crate::types::{MetricName, MetricRecord, MetricValue};

    struct SlowSink {
        release: AtomicBool,
    }

    impl Sink for SlowSink {
        fn name(&self) -> &str {
            "slow"
        }

        fn emit(&self, _snapshot: &FlushSnapshot) -> anyhow::Result<()> {
            while !self.release.load(Ordering::Acquire) {
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        }
    }

    struct FailSink;

    impl Sink for FailSink {
        fn name(&self) -> &str {
            "fail"
        }

        fn emit(&self, _snapshot: &FlushSnapshot) -> anyhow::Result<()> {
            Err(anyhow!("broken"))
        }
    }

    struct PanicSink;

    impl Sink for PanicSink {
        fn name(&self) -> &str {
            "panic"
        }

        fn emit(&self, _snapshot: &FlushSnapshot) -> anyhow::Result<()> {
            panic!("sink panic")
        }
    }

    fn manual_config() -> StatsdConfig {
        StatsdConfig {
            manual_flush: true,
            ..Default::default()
        }
    }

    fn add_counter(store: &AggregateStore, v: f64) {
        store.apply(MetricRecord::new(
            MetricName::from_str("c").unwrap(),
            MetricValue::Counter(v),
        ));
    }

    async fn wait_emitted(sink: &MemorySink, n: usize) {
        for _ in 0..200 {
            if sink.len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("sink did not receive {n} snapshots");
    }

    #[tokio::test]
    async fn manual_trigger() {
        let store = Arc::new(AggregateStore::new());
        let stats = Arc::new(ServerStats::new());
        let memory = Arc::new(MemorySink::new(4));
        let (scheduler, handle) = FlushScheduler::new(
            store.clone(),
            stats.clone(),
            vec![memory.clone() as ArcSink],
            &manual_config(),
        );

        let (quit_sender, quit_receiver) = broadcast::channel(1);
        let task = tokio::spawn(scheduler.into_running(quit_receiver));

        add_counter(&store, 2.0);
        add_counter(&store, 3.0);
        assert_eq!(handle.trigger().await.unwrap(), FlushOutcome::Started);
        wait_emitted(&memory, 1).await;

        let snap = memory.latest().unwrap();
        assert_eq!(snap.counters.get("c").unwrap().value, 5.0);
        assert!(store.is_empty());
        assert_eq!(stats.flushes(), 1);

        quit_sender.send(()).unwrap();
        task.await.unwrap();
        assert!(handle.trigger().await.is_err());
    }

    #[tokio::test]
    async fn skip_on_overrun() {
        let store = Arc::new(AggregateStore::new());
        let stats = Arc::new(ServerStats::new());
        let slow = Arc::new(SlowSink {
            release: AtomicBool::new(false),
        });
        let (scheduler, handle) = FlushScheduler::new(
            store.clone(),
            stats.clone(),
            vec![slow.clone() as ArcSink],
            &manual_config(),
        );

        let (quit_sender, quit_receiver) = broadcast::channel(1);
        let task = tokio::spawn(scheduler.into_running(quit_receiver));

        add_counter(&store, 1.0);
        assert_eq!(handle.trigger().await.unwrap(), FlushOutcome::Started);

        add_counter(&store, 1.0);
        assert_eq!(handle.trigger().await.unwrap(), FlushOutcome::Skipped);
        assert_eq!(stats.snapshot().flush_overruns, 1);
        // not drained
        assert_eq!(
            store.read_only_snapshot().counters.get("c").unwrap().value,
            1.0
        );

        slow.release.store(true, Ordering::Release);
        quit_sender.send(()).unwrap();
        task.await.unwrap();
        // the final flush takes the rest
        assert!(store.is_empty());
        assert_eq!(stats.flushes(), 2);
    }

    #[tokio::test]
    async fn no_sink_never_overruns() {
        let store = Arc::new(AggregateStore::new());
        let stats = Arc::new(ServerStats::new());
        let (scheduler, handle) =
            FlushScheduler::new(store.clone(), stats.clone(), Vec::new(), &manual_config());

        let (quit_sender, quit_receiver) = broadcast::channel(1);
        let task = tokio::spawn(scheduler.into_running(quit_receiver));

        for _ in 0..3 {
            add_counter(&store, 1.0);
            assert_eq!(handle.trigger().await.unwrap(), FlushOutcome::Started);
            assert!(store.is_empty());
        }
        assert_eq!(stats.flushes(), 3);
        assert_eq!(stats.snapshot().flush_overruns, 0);

        quit_sender.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn failing_sinks() {
        let store = Arc::new(AggregateStore::new());
        let stats = Arc::new(ServerStats::new());
        let memory = Arc::new(MemorySink::new(1));
        let sinks = vec![
            Arc::new(PanicSink) as ArcSink,
            Arc::new(FailSink) as ArcSink,
            memory.clone() as ArcSink,
        ];
        let (scheduler, handle) =
            FlushScheduler::new(store.clone(), stats.clone(), sinks, &manual_config());

        let (quit_sender, quit_receiver) = broadcast::channel(1);
        let task = tokio::spawn(scheduler.into_running(quit_receiver));

        add_counter(&store, 1.0);
        assert_eq!(handle.trigger().await.unwrap(), FlushOutcome::Started);
        wait_emitted(&memory, 1).await;
        assert_eq!(stats.sink_errors(), 2);

        quit_sender.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn periodic() {
        let store = Arc::new(AggregateStore::new());
        let stats = Arc::new(ServerStats::new());
        let memory = Arc::new(MemorySink::new(8));
        let config = StatsdConfig {
            flush_interval: Duration::from_millis(20),
            ..Default::default()
        };
        let (scheduler, _handle) = FlushScheduler::new(
            store.clone(),
            stats.clone(),
            vec![memory.clone() as ArcSink],
            &config,
        );

        let (quit_sender, quit_receiver) = broadcast::channel(1);
        let task = tokio::spawn(scheduler.into_running(quit_receiver));

        add_counter(&store, 4.0);
        wait_emitted(&memory, 2).await;
        let total: f64 = memory
            .all()
            .iter()
            .filter_map(|s| s.counters.get("c").map(|c| c.value))
            .sum();
        assert_eq!(total, 4.0);

        quit_sender.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn final_flush_on_shutdown() {
        let store = Arc::new(AggregateStore::new());
        let stats = Arc::new(ServerStats::new());
        let memory = Arc::new(MemorySink::new(1));
        let (scheduler, _handle) = FlushScheduler::new(
            store.clone(),
            stats.clone(),
            vec![memory.clone() as ArcSink],
            &manual_config(),
        );

        let (quit_sender, quit_receiver) = broadcast::channel(1);
        let task = tokio::spawn(scheduler.into_running(quit_receiver));

        add_counter(&store, 7.0);
        quit_sender.send(()).unwrap();
        task.await.unwrap();

        let snap = memory.latest().unwrap();
        assert_eq!(snap.counters.get("c").unwrap().value, 7.0);
    }
}
