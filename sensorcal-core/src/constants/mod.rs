//! Constants for SensorCal Core
//!
//! Centralised defaults for the acquisition engine. Every value here is a
//! default only; deployments override them through
//! [`AcquisitionConfig`](crate::config::AcquisitionConfig).
//!
//! ## Organization
//!
//! - **Adc**: converter resolution, filter sizes, physical calibration range
//! - **Pulse**: pulse-counting (anemometer) path
//! - **Time**: task cadences and guard wait budgets

/// Converter, filter and calibration-range defaults.
pub mod adc;

/// Pulse-counting path defaults.
pub mod pulse;

/// Cadences and wait budgets.
pub mod time;

pub use adc::{
    ADC_MAX_CODE, ANALOG_CHANNEL_COUNT, HYSTERESIS_DELTA, MOVING_AVERAGE_WINDOW,
    PHYSICAL_RANGE_MAX, PHYSICAL_RANGE_MIN,
};

pub use pulse::{PULSE_RATE_MAX, PULSE_RATE_MIN, PULSE_SCALE_FACTOR};

pub use time::{
    ANALOG_PERIOD_MS, PUBLISH_TIMEOUT_MS, PULSE_PERIOD_MS, READ_TIMEOUT_MS,
};
