//! Station facade
//!
//! [`Station`] wires the core engine to the hosted runtime:
//!
//! ```text
//!                 ┌──── analog driver ────► AnalogScheduler::tick ───┐
//! Station::start ─┤                                                  ├──► SnapshotPublisher
//!                 └──── pulse driver ─────► PulseRateConsumer::tick ─┘          ▲
//!                                                                               │
//!        get_value / status / set_point / calibrate (any thread) ───────────────┘
//! ```
//!
//! The scheduler sits behind a mutex only because calibration commands
//! arrive from other tasks; the analog driver is its sole ticker. A
//! calibration write holds the store for its whole duration but takes the
//! scheduler only to validate and then to apply the point, so the file write
//! never delays an analog tick. Lock order is always store, then scheduler.
//!
//! Shutdown stops and joins both drivers before the shared slots can be
//! released, so no tick ever writes to freed state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sensorcal_core::{
    channel::{persist_point, StoredCalibration},
    constants::adc::MOVING_AVERAGE_WINDOW,
    AcquisitionConfig, AdcReader, AnalogScheduler, CalibrationReport, CalibrationStore, ChannelId,
    ChannelStatus, MonotonicTime, PointId, PulseCounter, PulseRateConsumer, PulseStatus, QuantityId,
    SnapshotPublisher,
};

use crate::driver::PeriodicDriver;
use crate::error::StationResult;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Ticks never leave state half-updated across a panic, so a poisoned
    // guard is still consistent
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Running acquisition station with `N` analog channels
pub struct Station<A, S, const N: usize>
where
    A: AdcReader + Send + 'static,
    S: CalibrationStore + Send + 'static,
{
    config: AcquisitionConfig,
    scheduler: Arc<Mutex<AnalogScheduler<A, N>>>,
    store: Arc<Mutex<S>>,
    pulse: Arc<Mutex<PulseRateConsumer>>,
    counter: &'static PulseCounter,
    publisher: Arc<SnapshotPublisher<MonotonicTime, N>>,
    drivers: Vec<PeriodicDriver>,
}

impl<A, S, const N: usize> Station<A, S, N>
where
    A: AdcReader + Send + 'static,
    S: CalibrationStore + Send + 'static,
{
    /// Restore calibration from `store` and start both drivers
    ///
    /// `counter` must already be registered with the edge interrupt source.
    /// Must be called from within a Tokio runtime.
    pub fn start(
        config: AcquisitionConfig,
        adc: A,
        store: S,
        counter: &'static PulseCounter,
    ) -> StationResult<Self> {
        let mut scheduler = AnalogScheduler::new(adc, &config)?;
        for (channel, result) in scheduler.restore(&store).iter().enumerate() {
            match result {
                Ok(slope) => log::info!("ch{}: restored, slope {}", channel, slope),
                Err(err) => log::info!("ch{}: uncalibrated ({})", channel, err),
            }
        }

        let scheduler = Arc::new(Mutex::new(scheduler));
        let publisher = Arc::new(SnapshotPublisher::new(
            MonotonicTime::new(),
            config.publish_timeout(),
        ));
        let pulse = Arc::new(Mutex::new(PulseRateConsumer::new(
            config.pulse,
            config.pulse_period(),
        )));

        let analog = {
            let scheduler = Arc::clone(&scheduler);
            let publisher = Arc::clone(&publisher);
            PeriodicDriver::spawn("analog", config.analog_period(), move || {
                let report = lock(&scheduler).tick(&*publisher);
                for (channel, err) in report.failures() {
                    log::trace!("ch{}: tick failed: {}", channel, err);
                }
            })?
        };
        let wind = {
            let pulse = Arc::clone(&pulse);
            let publisher = Arc::clone(&publisher);
            PeriodicDriver::spawn("pulse", config.pulse_period(), move || {
                if let Err(err) = lock(&pulse).tick(counter, &*publisher) {
                    log::trace!("pulse: tick failed: {}", err);
                }
            })?
        };

        Ok(Self {
            config,
            scheduler,
            store: Arc::new(Mutex::new(store)),
            pulse,
            counter,
            publisher,
            drivers: vec![analog, wind],
        })
    }

    /// Latest value of `id`, waiting at most `budget`
    pub fn get_value(&self, id: QuantityId, budget: Duration) -> StationResult<f32> {
        Ok(self.publisher.get_value(id, budget)?)
    }

    /// Latest value of `id` within the configured read budget
    pub fn read(&self, id: QuantityId) -> StationResult<f32> {
        self.get_value(id, self.config.read_timeout())
    }

    /// Write an explicit calibration point
    pub fn set_point(
        &self,
        channel: ChannelId,
        which: PointId,
        code: u16,
        value: f32,
    ) -> StationResult<CalibrationReport> {
        let mut store = lock(&self.store);
        let point = lock(&self.scheduler).prepare_point(channel, which, code, value)?;
        persist_point(&mut *store, channel, which, point)?;
        Ok(lock(&self.scheduler).apply_point(channel, which, point)?)
    }

    /// Use the channel's current raw code as anchor `which` for `value`
    pub fn calibrate(
        &self,
        channel: ChannelId,
        which: PointId,
        value: f32,
    ) -> StationResult<CalibrationReport> {
        let mut store = lock(&self.store);
        let point = lock(&self.scheduler).prepare_from_live(channel, which, value)?;
        persist_point(&mut *store, channel, which, point)?;
        Ok(lock(&self.scheduler).apply_point(channel, which, point)?)
    }

    /// Introspection of one channel
    pub fn status(&self, channel: ChannelId) -> StationResult<ChannelStatus<MOVING_AVERAGE_WINDOW>> {
        Ok(lock(&self.scheduler).status(channel)?)
    }

    /// Anchors as stored, independent of the live model
    pub fn stored_calibration(&self, channel: ChannelId) -> StationResult<StoredCalibration> {
        let store = lock(&self.store);
        let stored = lock(&self.scheduler).stored_calibration(channel, &*store)?;
        Ok(stored)
    }

    /// Pulse path counters
    pub fn pulse_status(&self) -> PulseStatus {
        lock(&self.pulse).status(self.counter)
    }

    /// Shared publisher, for consumers on other tasks
    pub fn publisher(&self) -> Arc<SnapshotPublisher<MonotonicTime, N>> {
        Arc::clone(&self.publisher)
    }

    /// Configuration the station runs with
    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Both drivers still running
    pub fn is_running(&self) -> bool {
        !self.drivers.is_empty() && self.drivers.iter().all(PeriodicDriver::is_running)
    }

    /// Stop and join both drivers, then release everything
    pub async fn shutdown(mut self) -> StationResult<()> {
        let mut result = Ok(());
        for driver in self.drivers.drain(..) {
            let name = driver.name();
            match driver.shutdown().await {
                Ok(ticks) => log::info!("{}: {} ticks", name, ticks),
                Err(err) => {
                    log::error!("{}", err);
                    result = Err(err);
                }
            }
        }
        result
    }
}

impl<A, S, const N: usize> std::fmt::Debug for Station<A, S, N>
where
    A: AdcReader + Send + 'static,
    S: CalibrationStore + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Station")
            .field("channels", &N)
            .field("drivers", &self.drivers)
            .finish_non_exhaustive()
    }
}
