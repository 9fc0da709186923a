//! Acquisition Configuration
//!
//! One [`AcquisitionConfig`] describes both sensor paths. Defaults come from
//! [`constants`](crate::constants); deployments override single fields with
//! the `with_*` builders or, with the `serde` feature, deserialize the whole
//! struct (missing fields fall back to defaults).
//!
//! ```rust
//! use sensorcal_core::config::{AcquisitionConfig, RecalibrationPolicy};
//! use sensorcal_core::calibration::PhysicalRange;
//!
//! let config = AcquisitionConfig::default()
//!     .with_analog_period_ms(50)
//!     .with_channel_range(PhysicalRange::new(-40.0, 85.0))
//!     .with_recalibration_policy(RecalibrationPolicy::Invalidate);
//!
//! assert!(config.validate().is_ok());
//! ```

use core::time::Duration;

use crate::calibration::PhysicalRange;
use crate::constants::{
    adc::{ADC_MAX_CODE, HYSTERESIS_DELTA, PHYSICAL_RANGE_MAX, PHYSICAL_RANGE_MIN},
    pulse::{PULSE_RATE_MAX, PULSE_RATE_MIN, PULSE_SCALE_FACTOR},
    time::{ANALOG_PERIOD_MS, PUBLISH_TIMEOUT_MS, PULSE_PERIOD_MS, READ_TIMEOUT_MS},
};
use crate::errors::ConfigError;

/// What a failed recalibration does to a channel that was calibrated
///
/// A channel moves `Uncalibrated → Calibrated` on its first successful
/// recompute. This policy decides whether a later *failed* recompute can
/// move it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecalibrationPolicy {
    /// The last valid model stays in force; the channel keeps publishing
    #[default]
    KeepLastValid,
    /// The channel reverts to `Uncalibrated` and stops publishing
    Invalidate,
}

/// Pulse-counting path settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseConfig {
    /// Rate units per pulse counted in one interval
    pub scale_factor: f32,
    /// Lowest plausible rate
    pub rate_min: f32,
    /// Highest plausible rate
    pub rate_max: f32,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            scale_factor: PULSE_SCALE_FACTOR,
            rate_min: PULSE_RATE_MIN,
            rate_max: PULSE_RATE_MAX,
        }
    }
}

impl PulseConfig {
    /// Plausibility range as a [`PhysicalRange`]
    pub fn plausible(&self) -> PhysicalRange {
        PhysicalRange::new(self.rate_min, self.rate_max)
    }
}

/// Settings for the analog and pulse paths
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcquisitionConfig {
    /// Analog scheduler period (ms)
    pub analog_period_ms: u64,
    /// Pulse consumer period (ms)
    pub pulse_period_ms: u64,
    /// Write-side snapshot budget (ms)
    pub publish_timeout_ms: u64,
    /// Default consumer wait budget (ms)
    pub read_timeout_ms: u64,
    /// Largest converter code
    pub max_code: u16,
    /// Deadband half-width (codes)
    pub hysteresis_delta: u16,
    /// Physical range calibration values must fall in
    pub channel_range: PhysicalRange,
    /// Pulse path
    pub pulse: PulseConfig,
    /// Effect of a failed recalibration
    pub recalibration_policy: RecalibrationPolicy,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            analog_period_ms: ANALOG_PERIOD_MS,
            pulse_period_ms: PULSE_PERIOD_MS,
            publish_timeout_ms: PUBLISH_TIMEOUT_MS,
            read_timeout_ms: READ_TIMEOUT_MS,
            max_code: ADC_MAX_CODE,
            hysteresis_delta: HYSTERESIS_DELTA,
            channel_range: PhysicalRange::new(PHYSICAL_RANGE_MIN, PHYSICAL_RANGE_MAX),
            pulse: PulseConfig::default(),
            recalibration_policy: RecalibrationPolicy::default(),
        }
    }
}

impl AcquisitionConfig {
    /// Set the analog period
    pub fn with_analog_period_ms(mut self, ms: u64) -> Self {
        self.analog_period_ms = ms;
        self
    }

    /// Set the pulse consumer period
    pub fn with_pulse_period_ms(mut self, ms: u64) -> Self {
        self.pulse_period_ms = ms;
        self
    }

    /// Set the write-side snapshot budget
    pub fn with_publish_timeout_ms(mut self, ms: u64) -> Self {
        self.publish_timeout_ms = ms;
        self
    }

    /// Set the converter's largest code
    pub fn with_max_code(mut self, max_code: u16) -> Self {
        self.max_code = max_code;
        self
    }

    /// Set the deadband half-width
    pub fn with_hysteresis_delta(mut self, delta: u16) -> Self {
        self.hysteresis_delta = delta;
        self
    }

    /// Set the physical calibration range
    pub fn with_channel_range(mut self, range: PhysicalRange) -> Self {
        self.channel_range = range;
        self
    }

    /// Set the pulse path
    pub fn with_pulse(mut self, pulse: PulseConfig) -> Self {
        self.pulse = pulse;
        self
    }

    /// Set the recalibration policy
    pub fn with_recalibration_policy(mut self, policy: RecalibrationPolicy) -> Self {
        self.recalibration_policy = policy;
        self
    }

    /// Check every field; called by every constructor that takes a config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analog_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod { name: "analog_period_ms" });
        }
        if self.pulse_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod { name: "pulse_period_ms" });
        }
        if self.hysteresis_delta >= self.max_code {
            return Err(ConfigError::DeltaTooWide {
                delta: self.hysteresis_delta,
                max_code: self.max_code,
            });
        }
        for range in [self.channel_range, self.pulse.plausible()] {
            if !range.is_well_formed() {
                return Err(ConfigError::EmptyRange {
                    min: range.min,
                    max: range.max,
                });
            }
        }
        let factor = self.pulse.scale_factor;
        if !(factor.is_finite() && factor > 0.0) {
            return Err(ConfigError::BadScaleFactor { factor });
        }
        Ok(())
    }

    /// Analog period as a [`Duration`]
    pub fn analog_period(&self) -> Duration {
        Duration::from_millis(self.analog_period_ms)
    }

    /// Pulse period as a [`Duration`]
    pub fn pulse_period(&self) -> Duration {
        Duration::from_millis(self.pulse_period_ms)
    }

    /// Write budget as a [`Duration`]
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    /// Read budget as a [`Duration`]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AcquisitionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analog_period(), Duration::from_millis(100));
        assert_eq!(config.pulse_period(), Duration::from_secs(1));
        assert_eq!(config.max_code, 4095);
        assert_eq!(config.recalibration_policy, RecalibrationPolicy::KeepLastValid);
    }

    #[test]
    fn rejects_zero_period() {
        let config = AcquisitionConfig::default().with_pulse_period_ms(0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroPeriod { name: "pulse_period_ms" })
        );
    }

    #[test]
    fn rejects_empty_range() {
        let config = AcquisitionConfig::default().with_channel_range(PhysicalRange::new(10.0, 10.0));
        assert!(matches!(config.validate(), Err(ConfigError::EmptyRange { .. })));

        let config = AcquisitionConfig::default()
            .with_channel_range(PhysicalRange::new(f32::NEG_INFINITY, 10.0));
        assert!(matches!(config.validate(), Err(ConfigError::EmptyRange { .. })));
    }

    #[test]
    fn rejects_wide_delta_and_bad_factor() {
        let config = AcquisitionConfig::default().with_max_code(255).with_hysteresis_delta(255);
        assert!(matches!(config.validate(), Err(ConfigError::DeltaTooWide { .. })));

        let pulse = PulseConfig { scale_factor: 0.0, ..PulseConfig::default() };
        let config = AcquisitionConfig::default().with_pulse(pulse);
        assert!(matches!(config.validate(), Err(ConfigError::BadScaleFactor { .. })));
    }
}
