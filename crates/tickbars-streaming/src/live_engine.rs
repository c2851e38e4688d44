//! Live bar engine for real-time threshold bar construction
//!
//! Reads trades one at a time from a [`LiveTradeSource`] and fans each one out
//! to every configured accumulator before taking the next.
//!
//! Architecture:
//! - One ingestion task per session, no per-trade tasks or threads
//! - One lane per spec inside a [`SharedDispatcher`] (readable while running)
//! - Completed bars emitted to a bounded channel, with a choice between
//!   backpressure and dropping bars the consumer has no room for
//! - Graceful shutdown via `CancellationToken`; open buckets are handed back
//!   as checkpoints

use crate::errors::StreamError;
use crate::shared::{DEFAULT_HISTORY_CAPACITY, SharedDispatcher};
use crate::source::LiveTradeSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tickbars_core::{AccumulatorCheckpoint, BarSpec, EmittedBar};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default capacity of the completed-bar channel
pub const DEFAULT_BAR_CHANNEL_CAPACITY: usize = 500;

/// What ingestion does when the bar channel is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait for the consumer to make room
    #[default]
    Backpressure,
    /// Drop the bar that does not fit and keep ingesting
    DropNewest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Backpressure => write!(f, "backpressure"),
            OverflowPolicy::DropNewest => write!(f, "drop_newest"),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "backpressure" => Ok(OverflowPolicy::Backpressure),
            "drop_newest" | "drop-newest" => Ok(OverflowPolicy::DropNewest),
            other => Err(format!(
                "unknown overflow policy '{other}' (expected backpressure or drop_newest)"
            )),
        }
    }
}

/// Metrics for the live bar engine.
#[derive(Debug, Default)]
pub struct LiveEngineMetrics {
    pub trades_received: AtomicU64,
    pub bars_emitted: AtomicU64,
    pub bars_dropped: AtomicU64,
}

impl LiveEngineMetrics {
    /// Snapshot of current metrics.
    pub fn snapshot(&self) -> LiveEngineMetricsSnapshot {
        LiveEngineMetricsSnapshot {
            trades_received: self.trades_received.load(Ordering::Relaxed),
            bars_emitted: self.bars_emitted.load(Ordering::Relaxed),
            bars_dropped: self.bars_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Immutable metrics snapshot for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveEngineMetricsSnapshot {
    pub trades_received: u64,
    pub bars_emitted: u64,
    pub bars_dropped: u64,
}

/// Configuration for the live bar engine.
#[derive(Debug, Clone)]
pub struct LiveEngineConfig {
    /// One accumulator per spec, in this order
    pub specs: Vec<BarSpec>,
    /// Channel capacity for completed bars
    pub bar_channel_capacity: usize,
    pub overflow: OverflowPolicy,
    /// Bars retained per spec in the shared dispatcher
    pub history_capacity: usize,
    /// Open buckets to continue, matched by spec
    pub initial_checkpoints: Vec<AccumulatorCheckpoint>,
}

impl LiveEngineConfig {
    pub fn new(specs: Vec<BarSpec>) -> Self {
        Self {
            specs,
            bar_channel_capacity: DEFAULT_BAR_CHANNEL_CAPACITY,
            overflow: OverflowPolicy::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            initial_checkpoints: Vec::new(),
        }
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_bar_channel_capacity(mut self, capacity: usize) -> Self {
        self.bar_channel_capacity = capacity;
        self
    }

    /// Resume from the checkpoints of a previous session.
    /// Must be set before `LiveBarEngine::new()`.
    pub fn with_checkpoints(
        mut self,
        checkpoints: impl IntoIterator<Item = AccumulatorCheckpoint>,
    ) -> Self {
        self.initial_checkpoints.extend(checkpoints);
        self
    }
}

/// Why a live session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The shutdown token was cancelled; open buckets were discarded
    Cancelled,
    /// The transport went away; accumulators keep their state
    Disconnected,
    /// A finite source ran out of trades; accumulators keep their state
    Exhausted,
    /// The bar receiver was dropped; accumulators keep their state
    BarChannelClosed,
}

/// Outcome of one live session
#[derive(Debug)]
pub struct LiveSessionReport {
    pub end: SessionEnd,
    pub trades_received: u64,
    pub bars_emitted: u64,
    pub bars_dropped: u64,
    /// Emitted bars the session ended before it could hand over, in emission
    /// order. Their buckets are closed, so they are not in `checkpoints`.
    pub undelivered: Vec<EmittedBar>,
    /// Open buckets at the end of the session, one per spec
    pub checkpoints: Vec<AccumulatorCheckpoint>,
    /// Accumulators and bar history, for inspection or further feeding
    pub dispatcher: Arc<SharedDispatcher>,
}

/// Live bar engine: trade source → shared dispatcher → completed bars.
pub struct LiveBarEngine {
    config: LiveEngineConfig,
    dispatcher: Arc<SharedDispatcher>,
    bar_tx: Option<mpsc::Sender<EmittedBar>>,
    bar_rx: Option<mpsc::Receiver<EmittedBar>>,
    shutdown: CancellationToken,
    metrics: Arc<LiveEngineMetrics>,
    session: Option<JoinHandle<Result<LiveSessionReport, StreamError>>>,
    started: bool,
}

impl LiveBarEngine {
    /// Create a new live bar engine.
    ///
    /// Does NOT start ingesting, call `start()` or `run()` after creation. A
    /// checkpoint that cannot be restored is logged and its spec starts fresh.
    ///
    /// # Errors
    ///
    /// `ProcessingError::NoBarSpecs` / `DuplicateSpec` for a bad spec set
    pub fn new(mut config: LiveEngineConfig) -> Result<Self, StreamError> {
        let dispatcher = SharedDispatcher::with_history_capacity(
            config.specs.iter().copied(),
            config.history_capacity,
        )?;

        for checkpoint in std::mem::take(&mut config.initial_checkpoints) {
            let spec = checkpoint.spec;
            let has_open_bucket = checkpoint.has_open_bucket();
            match dispatcher.restore(checkpoint) {
                Ok(()) => tracing::info!(
                    %spec,
                    has_open_bucket,
                    "accumulator restored from checkpoint"
                ),
                Err(e) => tracing::warn!(
                    %spec,
                    error = %e,
                    "checkpoint restore failed, starting fresh"
                ),
            }
        }

        let (bar_tx, bar_rx) = mpsc::channel(config.bar_channel_capacity.max(1));
        Ok(Self {
            config,
            dispatcher: Arc::new(dispatcher),
            bar_tx: Some(bar_tx),
            bar_rx: Some(bar_rx),
            shutdown: CancellationToken::new(),
            metrics: Arc::new(LiveEngineMetrics::default()),
            session: None,
            started: false,
        })
    }

    pub fn config(&self) -> &LiveEngineConfig {
        &self.config
    }

    /// Take the bar receiver for an external consumer
    ///
    /// Afterwards `next_bar()` always returns `None`.
    pub fn bar_receiver(&mut self) -> Option<mpsc::Receiver<EmittedBar>> {
        self.bar_rx.take()
    }

    pub fn dispatcher(&self) -> Arc<SharedDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Spawn the ingestion task on the current tokio runtime.
    ///
    /// Collect the result with `finish()`.
    pub fn start<S>(&mut self, source: S) -> Result<(), StreamError>
    where
        S: LiveTradeSource + 'static,
    {
        let session = self.session_parts()?;
        self.session = Some(tokio::spawn(async move {
            let mut source = source;
            ingest(session, &mut source).await
        }));
        Ok(())
    }

    /// Run the session on the calling task until it ends.
    ///
    /// With `OverflowPolicy::Backpressure` someone else must drain the bar
    /// receiver, or ingestion stalls once the channel is full.
    pub async fn run<S>(&mut self, source: &mut S) -> Result<LiveSessionReport, StreamError>
    where
        S: LiveTradeSource + ?Sized,
    {
        let session = self.session_parts()?;
        ingest(session, source).await
    }

    fn session_parts(&mut self) -> Result<Session, StreamError> {
        if self.started {
            return Err(StreamError::AlreadyStarted);
        }
        let bar_tx = self.bar_tx.take().ok_or(StreamError::AlreadyStarted)?;
        self.started = true;

        tracing::info!(
            specs = %self
                .config
                .specs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
            bar_channel_capacity = self.config.bar_channel_capacity,
            overflow = %self.config.overflow,
            "live bar engine started"
        );

        Ok(Session {
            dispatcher: Arc::clone(&self.dispatcher),
            bar_tx,
            overflow: self.config.overflow,
            shutdown: self.shutdown.clone(),
            metrics: Arc::clone(&self.metrics),
        })
    }

    /// Receive next completed bar. Returns `None` on timeout or shutdown.
    ///
    /// Bars already in the channel are returned before shutdown is observed.
    pub async fn next_bar(&mut self, timeout: Duration) -> Option<EmittedBar> {
        let bar_rx = self.bar_rx.as_mut()?;
        tokio::select! {
            biased;
            result = bar_rx.recv() => result,
            () = self.shutdown.cancelled() => None,
            () = tokio::time::sleep(timeout) => None,
        }
    }

    /// Wait for the spawned session and return its report.
    ///
    /// Returns once the source disconnects or after `stop()`.
    pub async fn finish(&mut self) -> Result<LiveSessionReport, StreamError> {
        let handle = self.session.take().ok_or(StreamError::NotStarted)?;
        handle.await?
    }

    /// Graceful shutdown: ends the session at the next trade boundary.
    pub fn stop(&self) {
        tracing::info!("live bar engine stopping");
        self.shutdown.cancel();
    }

    /// Get engine metrics.
    pub fn metrics(&self) -> &LiveEngineMetrics {
        &self.metrics
    }

    /// Shared handle to the metrics, for readers on other threads.
    pub fn metrics_handle(&self) -> Arc<LiveEngineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Whether a session has been started.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Get the shutdown token (for external coordination).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

/// Everything the ingestion loop owns
struct Session {
    dispatcher: Arc<SharedDispatcher>,
    bar_tx: mpsc::Sender<EmittedBar>,
    overflow: OverflowPolicy,
    shutdown: CancellationToken,
    metrics: Arc<LiveEngineMetrics>,
}

enum Delivery {
    Sent,
    Dropped,
    Cancelled,
}

async fn deliver(session: &Session, emitted: EmittedBar) -> Result<Delivery, StreamError> {
    match session.overflow {
        OverflowPolicy::Backpressure => tokio::select! {
            biased;
            sent = session.bar_tx.send(emitted) => sent
                .map(|()| Delivery::Sent)
                .map_err(|_| StreamError::BarChannelClosed),
            () = session.shutdown.cancelled() => Ok(Delivery::Cancelled),
        },
        OverflowPolicy::DropNewest => match session.bar_tx.try_send(emitted) {
            Ok(()) => Ok(Delivery::Sent),
            Err(TrySendError::Full(_)) => Ok(Delivery::Dropped),
            Err(TrySendError::Closed(_)) => Err(StreamError::BarChannelClosed),
        },
    }
}

/// Hand over what is left of a trade's bars without waiting; bars that do
/// not fit are returned
fn flush(session: &Session, bars: impl Iterator<Item = EmittedBar>) -> Vec<EmittedBar> {
    bars.filter_map(|emitted| match session.bar_tx.try_send(emitted) {
        Ok(()) => None,
        Err(TrySendError::Full(emitted) | TrySendError::Closed(emitted)) => Some(emitted),
    })
    .collect()
}

/// Ingestion loop: one trade at a time, fanned out inline to every lane
async fn ingest<S>(session: Session, source: &mut S) -> Result<LiveSessionReport, StreamError>
where
    S: LiveTradeSource + ?Sized,
{
    let mut trades_received = 0u64;
    let mut bars_emitted = 0u64;
    let mut bars_dropped = 0u64;
    let mut undelivered = Vec::new();

    let end = 'ingest: loop {
        let next = tokio::select! {
            biased;
            () = session.shutdown.cancelled() => {
                tracing::info!("shutdown requested");
                break 'ingest SessionEnd::Cancelled;
            }
            next = source.next_trade() => next,
        };

        let trade = match next {
            Ok(Some(trade)) => trade,
            Ok(None) => {
                tracing::info!(trades = trades_received, "trade source exhausted");
                break 'ingest SessionEnd::Exhausted;
            }
            Err(StreamError::Disconnected) => {
                tracing::info!(trades = trades_received, "trade source disconnected");
                break 'ingest SessionEnd::Disconnected;
            }
            Err(e) => {
                tracing::warn!(error = %e, "trade source failed, stopping session");
                return Err(e);
            }
        };

        trades_received += 1;
        session.metrics.trades_received.fetch_add(1, Ordering::Relaxed);

        let mut pending = session.dispatcher.dispatch(&trade).into_iter();
        let count = pending.len() as u64;
        bars_emitted += count;
        session.metrics.bars_emitted.fetch_add(count, Ordering::Relaxed);

        while let Some(emitted) = pending.next() {
            let spec = emitted.spec;

            match deliver(&session, emitted).await {
                Ok(Delivery::Sent) => {}
                Ok(Delivery::Dropped) => {
                    bars_dropped += 1;
                    session.metrics.bars_dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(%spec, dropped = bars_dropped, "bar channel full, bar dropped");
                }
                Ok(Delivery::Cancelled) => {
                    undelivered = flush(&session, std::iter::once(emitted).chain(pending.by_ref()));
                    tracing::info!(
                        %spec,
                        undelivered = undelivered.len(),
                        "shutdown requested while waiting for bar channel"
                    );
                    break 'ingest SessionEnd::Cancelled;
                }
                Err(_) => {
                    undelivered = std::iter::once(emitted).chain(pending.by_ref()).collect();
                    tracing::warn!(%spec, "bar channel closed, stopping ingestion");
                    break 'ingest SessionEnd::BarChannelClosed;
                }
            }
        }
    };

    // Extract checkpoints from all lanes before the session ends
    let checkpoints = session.dispatcher.checkpoints();
    for checkpoint in &checkpoints {
        tracing::debug!(
            spec = %checkpoint.spec,
            has_open_bucket = checkpoint.has_open_bucket(),
            "checkpoint extracted"
        );
    }
    if end == SessionEnd::Cancelled {
        session.dispatcher.reset();
    }

    tracing::info!(
        ?end,
        trades = trades_received,
        bars = bars_emitted,
        dropped = bars_dropped,
        undelivered = undelivered.len(),
        "live session ended"
    );

    Ok(LiveSessionReport {
        end,
        trades_received,
        bars_emitted,
        bars_dropped,
        undelivered,
        checkpoints,
        dispatcher: session.dispatcher,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChannelTradeSource, StreamTradeSource};
    use tickbars_core::test_utils::{self, generators};
    use tickbars_core::{BarSet, Trade};

    fn stream(trades: Vec<Trade>) -> StreamTradeSource<futures::stream::Iter<std::vec::IntoIter<Trade>>> {
        StreamTradeSource::new(futures::stream::iter(trades))
    }

    #[test]
    fn test_live_engine_config_defaults() {
        let config = LiveEngineConfig::new(generators::default_specs());
        assert_eq!(config.specs.len(), 3);
        assert_eq!(config.bar_channel_capacity, 500);
        assert_eq!(config.overflow, OverflowPolicy::Backpressure);
        assert!(config.initial_checkpoints.is_empty());
    }

    #[test]
    fn test_overflow_policy_parsing() {
        assert_eq!("backpressure".parse(), Ok(OverflowPolicy::Backpressure));
        assert_eq!("drop-newest".parse(), Ok(OverflowPolicy::DropNewest));
        assert_eq!("DROP_NEWEST".parse(), Ok(OverflowPolicy::DropNewest));
        assert!("block".parse::<OverflowPolicy>().is_err());
        assert_eq!(
            serde_json::to_string(&OverflowPolicy::DropNewest).unwrap(),
            "\"drop_newest\""
        );
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = LiveEngineMetrics::default();
        metrics.trades_received.store(100, Ordering::Relaxed);
        metrics.bars_emitted.store(5, Ordering::Relaxed);
        metrics.bars_dropped.store(2, Ordering::Relaxed);

        let snap = metrics.snapshot();
        assert_eq!(snap.trades_received, 100);
        assert_eq!(snap.bars_emitted, 5);
        assert_eq!(snap.bars_dropped, 2);
    }

    #[test]
    fn test_live_engine_creation() {
        let engine = LiveBarEngine::new(LiveEngineConfig::new(generators::default_specs())).unwrap();
        assert!(!engine.is_started());

        assert!(matches!(
            LiveBarEngine::new(LiveEngineConfig::new(Vec::new())),
            Err(StreamError::Processing(_))
        ));
    }

    #[tokio::test]
    async fn test_bars_arrive_in_order() {
        let specs = generators::default_specs();
        let trades = generators::realistic_dataset(5_000);
        let expected = generators::process_one_by_one(&trades, &specs);

        let config = LiveEngineConfig::new(specs.clone()).with_bar_channel_capacity(4);
        let mut engine = LiveBarEngine::new(config).unwrap();
        let source = ChannelTradeSource::new(64);
        let trade_tx = source.trade_sender().unwrap();
        let mut bar_rx = engine.bar_receiver().unwrap();
        engine.start(source).unwrap();

        let feeder = tokio::spawn(async move {
            for trade in trades {
                trade_tx.send(trade).await.unwrap();
            }
        });

        let mut received = BarSet::with_specs(specs);
        while let Some(emitted) = bar_rx.recv().await {
            received.extend(emitted);
        }
        feeder.await.unwrap();

        let report = engine.finish().await.unwrap();
        assert_eq!(report.end, SessionEnd::Disconnected);
        assert_eq!(report.trades_received, 5_000);
        assert_eq!(report.bars_dropped, 0);
        assert_eq!(report.bars_emitted as usize, expected.total_bars());
        assert_eq!(received, expected);
        assert_eq!(engine.metrics().snapshot().bars_emitted, report.bars_emitted);
    }

    #[tokio::test]
    async fn test_cancellation_reports_checkpoints() {
        let tick = BarSpec::tick(10).unwrap();
        let mut engine = LiveBarEngine::new(LiveEngineConfig::new(vec![tick])).unwrap();
        let source = ChannelTradeSource::new(64);
        let trade_tx = source.trade_sender().unwrap();
        engine.start(source).unwrap();

        for trade in test_utils::unit_volume_trades(25, 10.0) {
            trade_tx.send(trade).await.unwrap();
        }
        for _ in 0..2 {
            let bar = engine.next_bar(Duration::from_secs(5)).await.unwrap();
            assert_eq!(bar.bar.cum_ticks, 10);
        }
        while engine.metrics().snapshot().trades_received < 25 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        engine.stop();
        let report = engine.finish().await.unwrap();

        assert_eq!(report.end, SessionEnd::Cancelled);
        assert_eq!(report.bars_emitted, 2);
        assert_eq!(report.checkpoints.len(), 1);
        let bucket = report.checkpoints[0].bucket.unwrap();
        assert_eq!(bucket.cum_ticks, 5);
        assert!(report.dispatcher.incomplete_bars().is_empty());
        assert_eq!(report.dispatcher.bars(&tick).len(), 2);

        // Transport still connected, but the session is over
        drop(trade_tx);
        assert!(engine.next_bar(Duration::from_millis(10)).await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_under_backpressure_keeps_emitted_bars() {
        // Every trade closes one bar per spec
        let specs = vec![
            BarSpec::tick(1).unwrap(),
            BarSpec::volume(1.0).unwrap(),
            BarSpec::dollar(10.0).unwrap(),
        ];
        let config = LiveEngineConfig::new(specs.clone()).with_bar_channel_capacity(1);
        let mut engine = LiveBarEngine::new(config).unwrap();
        let source = ChannelTradeSource::new(8);
        let trade_tx = source.trade_sender().unwrap();
        engine.start(source).unwrap();

        let trades = test_utils::unit_volume_trades(3, 10.0);
        for trade in &trades {
            trade_tx.send(*trade).await.unwrap();
        }
        // Nobody drains the bar channel: the first trade's second bar blocks
        while engine.metrics().snapshot().bars_emitted < 3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        engine.stop();
        let report = engine.finish().await.unwrap();
        assert_eq!(report.end, SessionEnd::Cancelled);
        assert_eq!(report.trades_received, 1);
        assert_eq!(report.bars_emitted, 3);

        let mut bar_rx = engine.bar_receiver().unwrap();
        let mut delivered = Vec::new();
        while let Ok(emitted) = bar_rx.try_recv() {
            delivered.push(emitted);
        }

        assert_eq!(
            delivered.len() as u64 + report.bars_dropped + report.undelivered.len() as u64,
            report.bars_emitted
        );
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].spec, specs[0]);
        let undelivered: Vec<BarSpec> = report.undelivered.iter().map(|e| e.spec).collect();
        assert_eq!(undelivered, specs[1..].to_vec());
        assert!(
            report
                .undelivered
                .iter()
                .all(|e| e.bar.open_time == trades[0].timestamp)
        );
        assert!(report.checkpoints.iter().all(|c| !c.has_open_bucket()));
    }

    #[tokio::test]
    async fn test_drop_newest_never_blocks() {
        let tick = BarSpec::tick(1).unwrap();
        let config = LiveEngineConfig::new(vec![tick])
            .with_bar_channel_capacity(1)
            .with_overflow(OverflowPolicy::DropNewest);
        let mut engine = LiveBarEngine::new(config).unwrap();

        // Nobody reads the bar channel while the session runs
        let mut source = stream(test_utils::unit_volume_trades(50, 10.0));
        let report = engine.run(&mut source).await.unwrap();

        assert_eq!(report.end, SessionEnd::Disconnected);
        assert_eq!(report.bars_emitted, 50);
        assert_eq!(report.bars_dropped, 49);
        assert_eq!(engine.metrics().snapshot().bars_dropped, 49);

        let first = engine.next_bar(Duration::from_millis(10)).await.unwrap();
        assert_eq!(first.bar.open_time, test_utils::trade(0, 10.0, 1.0).timestamp);
    }

    #[tokio::test]
    async fn test_dropped_receiver_ends_session() {
        let mut engine =
            LiveBarEngine::new(LiveEngineConfig::new(vec![BarSpec::tick(2).unwrap()])).unwrap();
        drop(engine.bar_receiver());

        let mut source = stream(test_utils::unit_volume_trades(10, 10.0));
        let report = engine.run(&mut source).await.unwrap();

        assert_eq!(report.end, SessionEnd::BarChannelClosed);
        assert_eq!(report.trades_received, 2);
        assert_eq!(report.bars_emitted, 1);
    }

    #[tokio::test]
    async fn test_resume_from_checkpoints() {
        let specs = vec![BarSpec::tick(7).unwrap(), BarSpec::volume(20.0).unwrap()];
        let trades = test_utils::sawtooth_trades(300, 10.0);
        let expected = generators::process_one_by_one(&trades, &specs);
        let (first_half, second_half) = trades.split_at(137);

        let config = LiveEngineConfig::new(specs.clone()).with_overflow(OverflowPolicy::DropNewest);
        let mut first = LiveBarEngine::new(config.clone()).unwrap();
        let report = first.run(&mut stream(first_half.to_vec())).await.unwrap();
        assert!(report.checkpoints.iter().any(|c| c.has_open_bucket()));

        let mut second =
            LiveBarEngine::new(config.with_checkpoints(report.checkpoints.clone())).unwrap();
        let resumed = second.run(&mut stream(second_half.to_vec())).await.unwrap();

        for spec in &specs {
            let mut bars = report.dispatcher.bars(spec);
            bars.extend(resumed.dispatcher.bars(spec));
            assert_eq!(bars, expected.bars(spec), "{spec}");
        }
    }

    #[tokio::test]
    async fn test_unusable_checkpoint_starts_fresh() {
        let foreign = tickbars_core::BarAccumulator::new(BarSpec::dollar(5.0).unwrap()).checkpoint();
        let config = LiveEngineConfig::new(vec![BarSpec::tick(3).unwrap()]).with_checkpoints([foreign]);
        let engine = LiveBarEngine::new(config).unwrap();
        assert!(engine.dispatcher().incomplete_bars().is_empty());
    }

    #[tokio::test]
    async fn test_session_lifecycle_errors() {
        let mut engine =
            LiveBarEngine::new(LiveEngineConfig::new(vec![BarSpec::tick(3).unwrap()])).unwrap();
        assert!(matches!(engine.finish().await, Err(StreamError::NotStarted)));

        engine.start(ChannelTradeSource::new(1)).unwrap();
        assert!(engine.is_started());
        assert!(matches!(
            engine.start(ChannelTradeSource::new(1)),
            Err(StreamError::AlreadyStarted)
        ));

        engine.stop();
        assert!(engine.next_bar(Duration::from_millis(50)).await.is_none());
        let report = engine.finish().await.unwrap();
        // The source's own sender was dropped on first read, so either end is possible
        assert!(matches!(
            report.end,
            SessionEnd::Cancelled | SessionEnd::Disconnected
        ));
    }
}
