//! Filter Pipeline
//!
//! Two transforms run on every raw code before calibration:
//!
//! ```text
//! raw ──► MovingAverage<K>::smooth ──► Deadband::apply ──► filtered code
//! ```
//!
//! Both keep their own rolling state and nothing else; a channel owns one of
//! each. Neither can fail.
//!
//! ## Deadband
//!
//! [`Deadband`] is a noise-rejection filter, not a hysteresis comparator. It
//! holds a band `[min, max]` of half-width `delta` around the last input
//! that left the band and reports the band floor for anything inside it:
//!
//! ```text
//! delta = 8, band [401, 417]
//!
//! input 405 → inside  → 401 (band unchanged)
//! input 417 → inside  → 401
//! input 430 → outside → band [422, 438] → 422
//! ```
//!
//! Small fluctuations are therefore quantised to the band floor. Bounds are
//! clamped to `[0, max_code]` and the lower clamp never underflows.

use crate::buffer::SampleRing;
use crate::constants::adc::ADC_MIN_CODE;

/// Truncating moving average over the last `K` raw codes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MovingAverage<const K: usize> {
    ring: SampleRing<K>,
}

impl<const K: usize> MovingAverage<K> {
    /// Zero-filled filter
    pub const fn new() -> Self {
        Self {
            ring: SampleRing::new(),
        }
    }

    /// Push `raw` and return the integer mean of all `K` slots
    ///
    /// Slots that have not been written yet count as zero, so the first
    /// `K - 1` results after start-up are biased low.
    pub fn smooth(&mut self, raw: u16) -> u16 {
        self.ring.push(raw);
        // mean of u16 values always fits in u16
        (self.ring.sum() / K as u32) as u16
    }

    /// Underlying ring, for introspection
    pub fn ring(&self) -> &SampleRing<K> {
        &self.ring
    }
}

/// Deadband filter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadband {
    min: u16,
    max: u16,
    delta: u16,
    max_code: u16,
}

impl Deadband {
    /// Filter with half-width `delta` over codes `[0, max_code]`
    ///
    /// The initial band is the single point `[0, 0]`, matching the initial
    /// output of 0: the first input above zero recentres the band.
    pub const fn new(delta: u16, max_code: u16) -> Self {
        Self {
            min: ADC_MIN_CODE,
            max: ADC_MIN_CODE,
            delta,
            max_code,
        }
    }

    /// Feed one smoothed code, get the filtered code
    pub fn apply(&mut self, input: u16) -> u16 {
        if self.contains(input) {
            return self.min;
        }

        self.min = input.saturating_sub(self.delta).max(ADC_MIN_CODE);
        self.max = input.saturating_add(self.delta).min(self.max_code);
        self.min
    }

    /// Whether `code` lies inside the current band (inclusive)
    pub fn contains(&self, code: u16) -> bool {
        code >= self.min && code <= self.max
    }

    /// Current band `(min, max)`
    pub fn band(&self) -> (u16, u16) {
        (self.min, self.max)
    }

    /// Configured half-width
    pub fn delta(&self) -> u16 {
        self.delta
    }
}
