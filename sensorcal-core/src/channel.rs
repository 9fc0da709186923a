//! Channel Engine
//!
//! One [`ChannelEngine`] owns everything about one analog channel: the
//! filter state, the calibration model and the counters. The scheduler owns
//! the engines, so nothing here needs a lock; only the published value is
//! shared, through the [`SnapshotPublisher`].
//!
//! ## Tick
//!
//! ```text
//! read_channel ──► smooth ──► deadband ──► apply(model) ──► publish
//!      │                                       │               │
//!   error: counter + 1,                  uncalibrated:     contended:
//!   published value kept                 nothing published dropped + counted
//! ```
//!
//! Raw and filtered codes are kept for introspection whether or not the
//! channel is calibrated.
//!
//! ## Lifecycle
//!
//! ```text
//!                 recompute ok
//! Uncalibrated ─────────────────► Calibrated ──┐
//!      ▲                              │  ▲     │ recompute ok / failed
//!      └──── failed + Invalidate ─────┘  └─────┘ (KeepLastValid)
//! ```
//!
//! The engine keeps two models: the *working* model that calibration points
//! are written into, and the *active* model that [`ChannelEngine::tick`]
//! publishes through. A successful recompute promotes the working model.
//! A failed one leaves the active model alone under
//! [`RecalibrationPolicy::KeepLastValid`] and clears it under
//! [`RecalibrationPolicy::Invalidate`].

use core::fmt;

use crate::buffer::SampleRing;
use crate::calibration::{
    CalibrationModel, CalibrationPoint, CalibrationStore, PointId, StoreKey,
};
use crate::config::{AcquisitionConfig, RecalibrationPolicy};
use crate::constants::adc::MOVING_AVERAGE_WINDOW;
use crate::errors::{
    AcquisitionError, CalibrationError, CalibrationResult, EngineError, EngineResult,
    PersistenceError, PublishError,
};
use crate::filter::{Deadband, MovingAverage};
use crate::hal::{AdcReader, ChannelId};
use crate::snapshot::{QuantityId, SnapshotPublisher};
use crate::time::TimeSource;

/// Calibration lifecycle of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationState {
    /// No valid model; nothing is published
    Uncalibrated,
    /// A valid model is in force
    Calibrated,
}

impl fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationState::Uncalibrated => f.write_str("uncalibrated"),
            CalibrationState::Calibrated => f.write_str("calibrated"),
        }
    }
}

/// Successful tick result
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// Value derived and published
    Published(f32),
    /// Sample filtered, nothing published (no valid model)
    Uncalibrated,
}

/// Result of writing one calibration point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationReport {
    /// Channel state after the write
    pub state: CalibrationState,
    /// Recompute of the working model: new slope or why it was rejected
    pub recompute: CalibrationResult<f32>,
}

/// Both anchors as read back from the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredCalibration {
    /// Low anchor
    pub d0: Result<CalibrationPoint, PersistenceError>,
    /// High anchor
    pub d1: Result<CalibrationPoint, PersistenceError>,
}

/// Introspection snapshot of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStatus<const K: usize> {
    /// Channel index
    pub channel: ChannelId,
    /// Lifecycle state
    pub state: CalibrationState,
    /// Last raw code read
    pub last_raw: Option<u16>,
    /// Last filtered code
    pub last_filtered: Option<u16>,
    /// Last value published
    pub last_value: Option<f32>,
    /// Failed hardware reads
    pub acquisition_errors: u32,
    /// Writes dropped on snapshot contention
    pub publish_contention: u32,
    /// Ticks that filtered a sample but published nothing
    pub suppressed: u32,
    /// Moving-average ring
    pub ring: SampleRing<K>,
    /// Deadband `(min, max)`
    pub band: (u16, u16),
    /// Deadband half-width
    pub delta: u16,
    /// Working model (points being edited)
    pub working: CalibrationModel,
    /// Model in force, if any
    pub active: Option<CalibrationModel>,
}

/// Per-channel acquisition and calibration state
#[derive(Debug, Clone)]
pub struct ChannelEngine<const K: usize = MOVING_AVERAGE_WINDOW> {
    id: ChannelId,
    max_code: u16,
    average: MovingAverage<K>,
    deadband: Deadband,
    working: CalibrationModel,
    active: Option<CalibrationModel>,
    policy: RecalibrationPolicy,
    last_raw: Option<u16>,
    last_filtered: Option<u16>,
    last_value: Option<f32>,
    acquisition_errors: u32,
    publish_contention: u32,
    suppressed: u32,
    failing: bool,
}

impl<const K: usize> ChannelEngine<K> {
    /// Uncalibrated channel `id`
    ///
    /// `config` is assumed to be validated already (the scheduler does it).
    pub fn new(id: ChannelId, config: &AcquisitionConfig) -> Self {
        Self {
            id,
            max_code: config.max_code,
            average: MovingAverage::new(),
            deadband: Deadband::new(config.hysteresis_delta, config.max_code),
            working: CalibrationModel::new(config.channel_range, config.max_code),
            active: None,
            policy: config.recalibration_policy,
            last_raw: None,
            last_filtered: None,
            last_value: None,
            acquisition_errors: 0,
            publish_contention: 0,
            suppressed: 0,
            failing: false,
        }
    }

    /// Channel index
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Acquire, filter, calibrate and publish one sample
    pub fn tick<A, C, const N: usize>(
        &mut self,
        adc: &mut A,
        publisher: &SnapshotPublisher<C, N>,
    ) -> EngineResult<TickOutcome>
    where
        A: AdcReader + ?Sized,
        C: TimeSource,
    {
        let raw = match self.acquire(adc) {
            Ok(raw) => raw,
            Err(err) => {
                self.acquisition_errors = self.acquisition_errors.wrapping_add(1);
                if !self.failing {
                    log_warn!("ch{}: acquisition failing: {}", self.id, err);
                    self.failing = true;
                }
                return Err(err.into());
            }
        };
        if self.failing {
            log_info!(
                "ch{}: acquisition recovered after {} errors",
                self.id,
                self.acquisition_errors
            );
            self.failing = false;
        }

        let filtered = self.deadband.apply(self.average.smooth(raw));
        self.last_raw = Some(raw);
        self.last_filtered = Some(filtered);

        let Some(model) = self.active.as_ref() else {
            self.suppressed = self.suppressed.wrapping_add(1);
            return Ok(TickOutcome::Uncalibrated);
        };
        let value = model.apply(filtered)?;

        match publisher.publish(QuantityId::Channel(self.id), value) {
            Ok(()) => {
                self.last_value = Some(value);
                Ok(TickOutcome::Published(value))
            }
            Err(err) => {
                if err == PublishError::Contention {
                    self.publish_contention = self.publish_contention.wrapping_add(1);
                    log_debug!("ch{}: publish dropped, slot contended", self.id);
                }
                Err(err.into())
            }
        }
    }

    fn acquire<A: AdcReader + ?Sized>(&self, adc: &mut A) -> Result<u16, AcquisitionError> {
        let channel = self.id;
        let code = adc
            .read_channel(channel)
            .map_err(|err| AcquisitionError::from_read(channel, err))?;
        if code > self.max_code {
            return Err(AcquisitionError::CodeOutOfRange {
                channel,
                code,
                max: self.max_code,
            });
        }
        Ok(code)
    }

    /// Write one calibration point, persist it, recompute
    ///
    /// The point is validated first and persisted before the model changes:
    /// a rejected value or a failed store write leaves the channel untouched.
    /// Once stored, the outcome of the recompute is reported in the
    /// [`CalibrationReport`] rather than as an error, because the point
    /// itself was accepted.
    pub fn set_point<S: CalibrationStore + ?Sized>(
        &mut self,
        which: PointId,
        code: u16,
        value: f32,
        store: &mut S,
    ) -> EngineResult<CalibrationReport> {
        let point = self.prepare_point(which, code, value)?;
        persist_point(store, self.id, which, point)?;
        self.apply_point(which, point)
    }

    /// Validate `(code, value)` as anchor `which` and tag it with its
    /// calibration session, without touching the channel
    ///
    /// Together with [`persist_point`] and [`apply_point`](Self::apply_point)
    /// this splits [`set_point`](Self::set_point) so a caller can run the
    /// store write without holding the engine.
    pub fn prepare_point(&self, which: PointId, code: u16, value: f32) -> EngineResult<CalibrationPoint> {
        if let Err(err) = self.working.check_point(code, value) {
            log_warn!("ch{}: calibration point {} rejected: {}", self.id, which, err);
            return Err(err.into());
        }
        Ok(CalibrationPoint::new(code, value, self.working.next_generation(which)))
    }

    /// Take a persisted anchor into the working model and recompute
    pub fn apply_point(&mut self, which: PointId, point: CalibrationPoint) -> EngineResult<CalibrationReport> {
        self.working.load_point(which, point)?;
        let recompute = self.promote();
        Ok(CalibrationReport {
            state: self.state(),
            recompute,
        })
    }

    /// Recompute the working model and apply the recalibration policy
    fn promote(&mut self) -> CalibrationResult<f32> {
        let result = self.working.recompute();
        match result {
            Ok(slope) => {
                if self.active.is_none() {
                    log_info!("ch{}: calibrated, slope {}", self.id, slope);
                } else {
                    log_info!("ch{}: recalibrated, slope {}", self.id, slope);
                }
                self.active = Some(self.working);
            }
            Err(CalibrationError::MissingPoint { point } | CalibrationError::StalePoint { point }) => {
                log_debug!("ch{}: waiting for point {}", self.id, point);
                self.demote();
            }
            Err(err) => {
                log_warn!("ch{}: recalibration rejected: {}", self.id, err);
                self.demote();
            }
        }
        result
    }

    fn demote(&mut self) {
        if self.policy == RecalibrationPolicy::Invalidate && self.active.take().is_some() {
            log_warn!("ch{}: calibration invalidated", self.id);
        }
    }

    /// Reload both anchors from `store` and recompute
    ///
    /// Missing or unreadable anchors are cleared from the working model.
    /// Anchors keep their stored generation, so a pair whose second write
    /// never landed restores as invalid instead of mixing sessions. Returns
    /// the recompute result.
    pub fn restore<S: CalibrationStore + ?Sized>(&mut self, store: &S) -> CalibrationResult<f32> {
        for which in PointId::ALL {
            let loaded = store
                .get(StoreKey::new(self.id, which))
                .map_err(EngineError::from)
                .and_then(|p| self.working.load_point(which, p).map_err(EngineError::from));
            if let Err(err) = loaded {
                if err != EngineError::Persistence(PersistenceError::NotFound) {
                    log_warn!("ch{}: restoring {} failed: {}", self.id, which, err);
                }
                self.working.clear_point(which);
            }
        }
        self.promote()
    }

    /// Read both anchors straight from `store`
    pub fn stored_calibration<S: CalibrationStore + ?Sized>(&self, store: &S) -> StoredCalibration {
        StoredCalibration {
            d0: store.get(StoreKey::new(self.id, PointId::D0)),
            d1: store.get(StoreKey::new(self.id, PointId::D1)),
        }
    }

    /// Lifecycle state
    pub fn state(&self) -> CalibrationState {
        if self.active.is_some() {
            CalibrationState::Calibrated
        } else {
            CalibrationState::Uncalibrated
        }
    }

    /// Model in force, if any
    pub fn active_model(&self) -> Option<&CalibrationModel> {
        self.active.as_ref()
    }

    /// Model calibration points are written into
    pub fn working_model(&self) -> &CalibrationModel {
        &self.working
    }

    /// Last raw code read
    pub fn last_raw(&self) -> Option<u16> {
        self.last_raw
    }

    /// Failed hardware reads so far
    pub fn acquisition_errors(&self) -> u32 {
        self.acquisition_errors
    }

    /// Everything about the channel in one copy
    pub fn status(&self) -> ChannelStatus<K> {
        ChannelStatus {
            channel: self.id,
            state: self.state(),
            last_raw: self.last_raw,
            last_filtered: self.last_filtered,
            last_value: self.last_value,
            acquisition_errors: self.acquisition_errors,
            publish_contention: self.publish_contention,
            suppressed: self.suppressed,
            ring: self.average.ring().clone(),
            band: self.deadband.band(),
            delta: self.deadband.delta(),
            working: self.working,
            active: self.active,
        }
    }
}

/// Write `point` as anchor `which` of `channel`
pub fn persist_point<S: CalibrationStore + ?Sized>(
    store: &mut S,
    channel: ChannelId,
    which: PointId,
    point: CalibrationPoint,
) -> EngineResult<()> {
    let key = StoreKey::new(channel, which);
    store.set(key, point).map_err(|err| {
        log_error!("ch{}: storing {} failed: {}", channel, key, err);
        EngineError::from(err)
    })
}
