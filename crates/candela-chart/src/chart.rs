//! Concurrency-safe candle chart.
//!
//! A [`CandleChart`] owns the chronological candle history for one
//! instrument. Trades are bucketed with the chart's [`TimeSeries`], applied
//! under a single exclusive lock, and observers are notified once the lock
//! has been released. A [`RolloverScheduler`] keeps the history continuous
//! by opening an empty candle at every bucket boundary.

use std::collections::HashMap;
use std::sync::Arc;

use candela_session::{SessionCalendar, TimeSeries};
use candela_types::{Candle, ChartError, Period, Result, TradeUpdate};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{ChartConfig, Clock, Notifier, ObserverId, RolloverScheduler, RolloverState, RolloverTarget, SystemClock};

/// Candle history guarded by the chart lock.
#[derive(Debug, Default)]
struct ChartState {
    /// Candles in ascending bucket order.
    candles: Vec<Candle>,
    /// Position of each bucket in `candles`.
    index: HashMap<DateTime<Utc>, usize>,
}

impl ChartState {
    fn current(&self) -> Option<&Candle> {
        self.candles.last()
    }

    fn previous(&self) -> Option<&Candle> {
        let idx = self.candles.len().checked_sub(2)?;
        self.candles.get(idx)
    }

    /// Rejects buckets before the current candle.
    fn check_order(&self, bucket: DateTime<Utc>) -> Result<()> {
        match self.current().map(Candle::bucket_start) {
            Some(current) if bucket < current => Err(ChartError::OutOfOrder { bucket, current }),
            _ => Ok(()),
        }
    }

    /// Applies `update` to the candle for `bucket`, opening it if needed.
    fn apply(&mut self, bucket: DateTime<Utc>, update: TradeUpdate) -> Result<Candle> {
        self.check_order(bucket)?;
        if let Some(candle) = self.index.get(&bucket).and_then(|&idx| self.candles.get_mut(idx)) {
            candle.apply(update)?;
            return Ok(candle.clone());
        }
        self.open(bucket, Some(update))
    }

    /// Opens an empty candle for `bucket` unless one exists.
    fn ensure(&mut self, bucket: DateTime<Utc>) -> Result<Option<Candle>> {
        if self.index.contains_key(&bucket) {
            return Ok(None);
        }
        self.check_order(bucket)?;
        self.open(bucket, None).map(Some)
    }

    /// Appends a candle for `bucket`, seeded with the current close.
    ///
    /// Nothing is appended if `update` is rejected.
    fn open(&mut self, bucket: DateTime<Utc>, update: Option<TradeUpdate>) -> Result<Candle> {
        let mut candle = Candle::seeded(bucket, self.current().and_then(Candle::close));
        if let Some(update) = update {
            candle.apply(update)?;
        }
        self.index.insert(bucket, self.candles.len());
        self.candles.push(candle.clone());
        debug!(bucket = %bucket, candles = self.candles.len(), "opened candle");
        Ok(candle)
    }
}

/// Shared chart internals, also driven by the rollover scheduler.
#[derive(Debug)]
struct ChartInner {
    series: RwLock<TimeSeries>,
    state: Mutex<ChartState>,
    notifier: Notifier,
    shutdown: CancellationToken,
}

impl ChartInner {
    fn bucket_for(&self, t: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if self.shutdown.is_cancelled() {
            return Err(ChartError::Stopped);
        }
        self.series.read().next_bucket_start(t)
    }

    fn record(&self, t: DateTime<Utc>, update: TradeUpdate) -> Result<Candle> {
        let bucket = self.bucket_for(t)?;
        let candle = self.state.lock().apply(bucket, update)?;
        trace!(bucket = %bucket, volume = candle.volume(), "candle updated");
        self.notifier.notify(&candle);
        Ok(candle)
    }

    fn record_empty(&self, t: DateTime<Utc>) -> Result<Option<Candle>> {
        let bucket = self.bucket_for(t)?;
        let candle = self.state.lock().ensure(bucket)?;
        if let Some(candle) = &candle {
            self.notifier.notify(candle);
        }
        Ok(candle)
    }
}

impl RolloverTarget for ChartInner {
    fn next_boundary(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.series.read().next_bucket_start(after)
    }

    fn roll(&self, at: DateTime<Utc>) -> Result<()> {
        self.record_empty(at).map(|_| ())
    }
}

/// A live OHLCV chart for one instrument.
///
/// All ingestion methods are safe to call concurrently with each other and
/// with the chart's background rollover. The history is append-only and
/// chronological: updates mapping to a bucket before the current candle
/// are rejected.
///
/// A chart must be created inside a tokio runtime, which hosts its
/// rollover scheduler. Dropping the chart stops the scheduler.
#[derive(Debug)]
pub struct CandleChart {
    inner: Arc<ChartInner>,
    scheduler: RolloverScheduler,
}

impl CandleChart {
    /// Creates a chart driven by the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::NoNextBucket`] if no bucket is reachable from
    /// now, or [`ChartError::NoRuntime`] outside of a tokio runtime.
    pub fn new(config: ChartConfig, calendar: SessionCalendar) -> Result<Self> {
        Self::with_clock(config, calendar, Arc::new(SystemClock))
    }

    /// Creates a chart driven by `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::NoNextBucket`] if no bucket is reachable from
    /// `clock.now()`, or [`ChartError::NoRuntime`] outside of a tokio runtime.
    pub fn with_clock(config: ChartConfig, calendar: SessionCalendar, clock: Arc<dyn Clock>) -> Result<Self> {
        let shutdown = CancellationToken::new();
        let inner = Arc::new(ChartInner {
            series: RwLock::new(TimeSeries::new(config.period, calendar, config.timezone)),
            state: Mutex::new(ChartState::default()),
            notifier: Notifier::new(),
            shutdown: shutdown.clone(),
        });
        let scheduler = RolloverScheduler::spawn(Arc::clone(&inner), clock, config.fallback_retry(), shutdown)?;
        Ok(Self { inner, scheduler })
    }

    /// Records a priced trade at `t`.
    ///
    /// The trade is attributed to the live candle in progress, i.e. the
    /// bucket starting at `next_bucket_start(t)`. Returns the updated candle.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::OutOfOrder`] if the bucket precedes the current
    /// candle, [`ChartError::NoNextBucket`] if `t` maps to no session,
    /// [`ChartError::Overflow`] if the candle's volume or turnover would
    /// overflow, or [`ChartError::Stopped`] after [`stop`](Self::stop).
    /// A rejected update leaves the chart unchanged.
    pub fn record_trade(&self, t: DateTime<Utc>, price: Decimal, volume: u64) -> Result<Candle> {
        self.record(t, TradeUpdate::trade(price, volume))
    }

    /// Records volume at `t` without touching open/high/low/close.
    ///
    /// # Errors
    ///
    /// Same as [`record_trade`](Self::record_trade).
    pub fn record_volume_only(&self, t: DateTime<Utc>, volume: u64) -> Result<Candle> {
        self.record(t, TradeUpdate::volume_only(volume))
    }

    /// Records any trade update at `t`.
    ///
    /// # Errors
    ///
    /// Same as [`record_trade`](Self::record_trade).
    pub fn record(&self, t: DateTime<Utc>, update: TradeUpdate) -> Result<Candle> {
        self.inner.record(t, update)
    }

    /// Ensures a candle exists for the bucket following `t`.
    ///
    /// Creates an empty candle seeded with the previous close when the
    /// bucket is new and returns it; returns `None` if the bucket already
    /// exists. Observers are only notified when a candle is created.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::OutOfOrder`] for a missing bucket before the
    /// current candle, [`ChartError::NoNextBucket`] if `t` maps to no
    /// session, or [`ChartError::Stopped`] after [`stop`](Self::stop).
    pub fn record_empty(&self, t: DateTime<Utc>) -> Result<Option<Candle>> {
        self.inner.record_empty(t)
    }

    /// Registers a session window for the local day of `start`.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::InvalidWindow`] if `end <= start`.
    pub fn append_session_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<NaiveDate> {
        self.inner.series.write().append_window(start, end)
    }

    /// Registers an observer called with every created or updated candle.
    ///
    /// Observers run synchronously on the recording thread after the chart
    /// lock is released and must not call back into this chart.
    pub fn register_observer<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&Candle) + Send + Sync + 'static,
    {
        self.inner.notifier.register(observer)
    }

    /// Removes an observer. Returns false if it was not registered.
    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        self.inner.notifier.unregister(id)
    }

    /// Stops the background rollover. Later ingestion fails with
    /// [`ChartError::Stopped`]. Repeated calls are no-ops.
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Stops the chart and waits for the rollover task to exit.
    pub async fn shutdown(&self) {
        self.stop();
        self.scheduler.join().await;
    }

    /// Returns true once the chart has been stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Returns the rollover scheduler's state.
    #[must_use]
    pub fn rollover_state(&self) -> RolloverState {
        self.scheduler.state()
    }

    /// Returns the latest candle.
    #[must_use]
    pub fn current(&self) -> Option<Candle> {
        self.inner.state.lock().current().cloned()
    }

    /// Returns the candle before the latest one.
    #[must_use]
    pub fn previous(&self) -> Option<Candle> {
        self.inner.state.lock().previous().cloned()
    }

    /// Returns the candle for `bucket`, if any.
    #[must_use]
    pub fn candle_at(&self, bucket: DateTime<Utc>) -> Option<Candle> {
        let state = self.inner.state.lock();
        state.index.get(&bucket).and_then(|&idx| state.candles.get(idx)).cloned()
    }

    /// Returns a snapshot of the history in bucket order.
    #[must_use]
    pub fn history(&self) -> Vec<Candle> {
        self.inner.state.lock().candles.clone()
    }

    /// Returns the number of candles in the history.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().candles.len()
    }

    /// Returns true if no candle has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().candles.is_empty()
    }

    /// Returns the aggregation period.
    #[must_use]
    pub fn period(&self) -> Period {
        self.inner.series.read().period()
    }

    /// Returns the bucketing timezone.
    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.inner.series.read().timezone()
    }

    /// Returns the bucket the next update at `t` would be recorded in.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::NoNextBucket`] if `t` maps to no session.
    pub fn bucket_for(&self, t: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.inner.series.read().next_bucket_start(t)
    }

    /// Returns true if `t` lies within a configured session.
    #[must_use]
    pub fn is_within_session(&self, t: DateTime<Utc>) -> bool {
        self.inner.series.read().is_within_session(t)
    }
}
