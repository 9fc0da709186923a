//! Analog Acquisition Scheduler
//!
//! [`AnalogScheduler`] owns the converter and one [`ChannelEngine`] per
//! channel in a fixed-size array indexed by [`ChannelId`]. Each
//! [`tick`](AnalogScheduler::tick) visits every channel in index order; a
//! failing channel is recorded in the [`TickReport`] and the loop moves on.
//!
//! The scheduler does not own a timer. Whatever drives it (an RTOS task, a
//! hardware timer interrupt, `sensorcal-station`'s periodic driver) calls
//! `tick` once per [`period`](AnalogScheduler::period).
//!
//! ```rust
//! use core::time::Duration;
//! use sensorcal_core::config::AcquisitionConfig;
//! use sensorcal_core::hal::{AdcReader, ChannelId, HardwareError};
//! use sensorcal_core::scheduler::AnalogScheduler;
//! use sensorcal_core::snapshot::SnapshotPublisher;
//! use sensorcal_core::time::MonotonicTime;
//!
//! struct Flat;
//! impl AdcReader for Flat {
//!     fn read_channel(&mut self, _ch: ChannelId) -> nb::Result<u16, HardwareError> {
//!         Ok(1200)
//!     }
//! }
//!
//! let config = AcquisitionConfig::default();
//! let mut scheduler = AnalogScheduler::<_, 2>::new(Flat, &config).unwrap();
//! let publisher = SnapshotPublisher::<_, 2>::new(MonotonicTime::new(), config.publish_timeout());
//!
//! let report = scheduler.tick(&publisher);
//! assert!(report.all_ok());
//! ```

use core::time::Duration;

use crate::calibration::{CalibrationPoint, CalibrationStore, PointId};
use crate::channel::{
    persist_point, CalibrationReport, ChannelEngine, ChannelStatus, StoredCalibration, TickOutcome,
};
use crate::config::AcquisitionConfig;
use crate::constants::adc::MOVING_AVERAGE_WINDOW;
use crate::errors::{AcquisitionError, CalibrationResult, ConfigError, EngineError, EngineResult};
use crate::hal::{AdcReader, ChannelId};
use crate::snapshot::SnapshotPublisher;
use crate::time::TimeSource;

/// Per-channel results of one scheduler tick, in channel order
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport<const N: usize> {
    /// Outcome of each channel
    pub outcomes: [EngineResult<TickOutcome>; N],
}

impl<const N: usize> TickReport<N> {
    /// Channels whose tick failed
    pub fn failures(&self) -> impl Iterator<Item = (ChannelId, EngineError)> + '_ {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|e| (i as ChannelId, *e)))
    }

    /// Number of values published this tick
    pub fn published(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|r| matches!(r, Ok(TickOutcome::Published(_))))
            .count()
    }

    /// No channel failed
    pub fn all_ok(&self) -> bool {
        self.outcomes.iter().all(Result::is_ok)
    }
}

/// Fixed-order periodic loop over `N` analog channels
pub struct AnalogScheduler<A: AdcReader, const N: usize, const K: usize = MOVING_AVERAGE_WINDOW> {
    adc: A,
    channels: [ChannelEngine<K>; N],
    period: Duration,
}

impl<A: AdcReader, const N: usize, const K: usize> AnalogScheduler<A, N, K> {
    /// Validate `config` and build `N` uncalibrated channels
    pub fn new(adc: A, config: &AcquisitionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            adc,
            // ids fit: channel counts are tiny compile-time constants
            channels: core::array::from_fn(|i| ChannelEngine::new(i as ChannelId, config)),
            period: config.analog_period(),
        })
    }

    /// Tick every channel once, in index order
    pub fn tick<C: TimeSource>(&mut self, publisher: &SnapshotPublisher<C, N>) -> TickReport<N> {
        let adc = &mut self.adc;
        TickReport {
            outcomes: self
                .channels
                .each_mut()
                .map(|channel| channel.tick(&mut *adc, publisher)),
        }
    }

    /// Restore every channel from `store`; returns the recompute results
    pub fn restore<S: CalibrationStore + ?Sized>(&mut self, store: &S) -> [CalibrationResult<f32>; N] {
        let results = self.channels.each_mut().map(|channel| channel.restore(store));
        log_info!(
            "restored {} of {} channels",
            results.iter().filter(|r: &&CalibrationResult<f32>| r.is_ok()).count(),
            N
        );
        results
    }

    /// Write an explicit calibration point for `channel`
    pub fn set_point<S: CalibrationStore + ?Sized>(
        &mut self,
        channel: ChannelId,
        which: PointId,
        code: u16,
        value: f32,
        store: &mut S,
    ) -> EngineResult<CalibrationReport> {
        self.channel_mut(channel)?.set_point(which, code, value, store)
    }

    /// Read `channel` now and use that code as anchor `which` for `value`
    pub fn calibrate_from_live<S: CalibrationStore + ?Sized>(
        &mut self,
        channel: ChannelId,
        which: PointId,
        value: f32,
        store: &mut S,
    ) -> EngineResult<CalibrationReport> {
        let point = self.prepare_from_live(channel, which, value)?;
        persist_point(store, channel, which, point)?;
        self.apply_point(channel, which, point)
    }

    /// Validate anchor `which` of `channel` without changing it; see
    /// [`ChannelEngine::prepare_point`]
    pub fn prepare_point(
        &self,
        channel: ChannelId,
        which: PointId,
        code: u16,
        value: f32,
    ) -> EngineResult<CalibrationPoint> {
        self.channel(channel)?.prepare_point(which, code, value)
    }

    /// Read `channel` now and validate that code as anchor `which`
    pub fn prepare_from_live(
        &mut self,
        channel: ChannelId,
        which: PointId,
        value: f32,
    ) -> EngineResult<CalibrationPoint> {
        let index = self.index(channel)?;
        let code = self
            .adc
            .read_channel(channel)
            .map_err(|err| AcquisitionError::from_read(channel, err))?;
        log_info!("ch{}: live code {} for point {}", channel, code, which);
        self.channels[index].prepare_point(which, code, value)
    }

    /// Take an already persisted anchor into `channel` and recompute
    pub fn apply_point(
        &mut self,
        channel: ChannelId,
        which: PointId,
        point: CalibrationPoint,
    ) -> EngineResult<CalibrationReport> {
        self.channel_mut(channel)?.apply_point(which, point)
    }

    /// Read both anchors of `channel` from `store`
    pub fn stored_calibration<S: CalibrationStore + ?Sized>(
        &self,
        channel: ChannelId,
        store: &S,
    ) -> EngineResult<StoredCalibration> {
        Ok(self.channel(channel)?.stored_calibration(store))
    }

    /// Status of `channel`
    pub fn status(&self, channel: ChannelId) -> EngineResult<ChannelStatus<K>> {
        Ok(self.channel(channel)?.status())
    }

    /// Engine of `channel`
    pub fn channel(&self, channel: ChannelId) -> EngineResult<&ChannelEngine<K>> {
        let index = self.index(channel)?;
        Ok(&self.channels[index])
    }

    fn channel_mut(&mut self, channel: ChannelId) -> EngineResult<&mut ChannelEngine<K>> {
        let index = self.index(channel)?;
        Ok(&mut self.channels[index])
    }

    fn index(&self, channel: ChannelId) -> EngineResult<usize> {
        let index = usize::from(channel);
        if index < N {
            Ok(index)
        } else {
            Err(EngineError::UnknownChannel { channel, count: N })
        }
    }

    /// All engines, in index order
    pub fn channels(&self) -> &[ChannelEngine<K>; N] {
        &self.channels
    }

    /// Configured tick period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Converter, e.g. to reconfigure it between ticks
    pub fn adc_mut(&mut self) -> &mut A {
        &mut self.adc
    }
}
