//! Pulse Counting Path
//!
//! ## Overview
//!
//! A pulse sensor (e.g. a reed-switch anemometer) produces one edge per
//! revolution. The path is split across two execution contexts:
//!
//! ```text
//!  GPIO edge ──► PulseCounter::on_edge        (interrupt context)
//!                     │  fetch_add(1)
//!                     ▼
//!               AtomicU32 count
//!                     │  swap(0) once per interval
//!                     ▼
//!  PulseRateConsumer::tick ──► rate = pulses × scale ──► publish
//!                              (periodic task context)
//! ```
//!
//! ## Drain
//!
//! The consumer takes the count and resets it in one atomic `swap`. An edge
//! landing just before the swap is counted in this interval, one landing
//! just after it in the next; none is lost or counted twice. The producer
//! never resets the counter.
//!
//! ## Failure handling
//!
//! - Zero pulses in an interval is not published as a rate of zero: the
//!   idle counter increments and the previous rate stays visible.
//! - A rate outside the configured plausibility range is not published;
//!   the implausible counter increments.
//! - A contended snapshot slot drops the update like the analog path does.

use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;

use crate::config::PulseConfig;
use crate::errors::{EngineError, EngineResult, PublishError};
use crate::hal::EdgeListener;
use crate::snapshot::{QuantityId, SnapshotPublisher};
use crate::time::TimeSource;

/// Interrupt-side edge counter
///
/// Meant to live in a `static` so the interrupt registration primitive can
/// hold a `&'static` reference to it.
#[derive(Debug, Default)]
pub struct PulseCounter {
    count: AtomicU32,
}

impl PulseCounter {
    /// Counter at zero
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Count one edge; safe to call from interrupt context
    #[inline]
    pub fn record(&self) {
        // Wraps after 2^32 edges in one interval, far beyond any sensor
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Take all pulses counted so far and reset to zero
    #[inline]
    pub fn drain(&self) -> u32 {
        self.count.swap(0, Ordering::AcqRel)
    }

    /// Pulses counted since the last drain
    pub fn pending(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}

impl EdgeListener for PulseCounter {
    fn on_edge(&self) {
        self.record();
    }
}

/// Successful pulse tick result
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PulseOutcome {
    /// Rate computed and published
    Published(f32),
    /// No pulses this interval; nothing published
    Idle,
}

/// Pulse path counters and last rate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PulseStatus {
    /// Last rate published
    pub last_rate: Option<f32>,
    /// Pulses in the last drained interval
    pub last_pulses: u32,
    /// Intervals with no pulses
    pub idle_intervals: u32,
    /// Rates rejected by the plausibility range
    pub implausible: u32,
    /// Writes dropped on snapshot contention
    pub contention: u32,
    /// Pulses counted since the last drain
    pub pending: u32,
}

/// Periodic consumer turning drained pulse counts into a rate
#[derive(Debug, Clone)]
pub struct PulseRateConsumer {
    config: PulseConfig,
    period: Duration,
    last_rate: Option<f32>,
    last_pulses: u32,
    idle_intervals: u32,
    implausible: u32,
    contention: u32,
}

impl PulseRateConsumer {
    /// Consumer running every `period`
    pub fn new(config: PulseConfig, period: Duration) -> Self {
        Self {
            config,
            period,
            last_rate: None,
            last_pulses: 0,
            idle_intervals: 0,
            implausible: 0,
            contention: 0,
        }
    }

    /// Drain `counter`, convert, publish
    pub fn tick<C: TimeSource, const N: usize>(
        &mut self,
        counter: &PulseCounter,
        publisher: &SnapshotPublisher<C, N>,
    ) -> EngineResult<PulseOutcome> {
        let pulses = counter.drain();
        self.last_pulses = pulses;

        if pulses == 0 {
            self.idle_intervals = self.idle_intervals.wrapping_add(1);
            log_debug!("pulse: idle interval ({} so far)", self.idle_intervals);
            return Ok(PulseOutcome::Idle);
        }

        let rate = self.rate_for(pulses);
        let plausible = self.config.plausible();
        if !plausible.contains(rate) {
            self.implausible = self.implausible.wrapping_add(1);
            log_warn!(
                "pulse: rate {} from {} pulses outside [{}, {}]",
                rate,
                pulses,
                plausible.min,
                plausible.max
            );
            return Err(EngineError::RateOutOfRange {
                rate,
                min: plausible.min,
                max: plausible.max,
            });
        }

        match publisher.publish(QuantityId::PulseRate, rate) {
            Ok(()) => {
                self.last_rate = Some(rate);
                Ok(PulseOutcome::Published(rate))
            }
            Err(err) => {
                if err == PublishError::Contention {
                    self.contention = self.contention.wrapping_add(1);
                    log_debug!("pulse: publish dropped, slot contended");
                }
                Err(err.into())
            }
        }
    }

    /// Rate for `pulses` counted in one interval
    pub fn rate_for(&self, pulses: u32) -> f32 {
        pulses as f32 * self.config.scale_factor
    }

    /// Configured interval
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Counters, plus the pulses `counter` has accumulated so far
    pub fn status(&self, counter: &PulseCounter) -> PulseStatus {
        PulseStatus {
            last_rate: self.last_rate,
            last_pulses: self.last_pulses,
            idle_intervals: self.idle_intervals,
            implausible: self.implausible,
            contention: self.contention,
            pending: counter.pending(),
        }
    }
}
