//! Analog Path Defaults
//!
//! Values for a 12-bit successive-approximation converter feeding two
//! thermistor channels.

/// Number of analog channels polled by the scheduler.
pub const ANALOG_CHANNEL_COUNT: usize = 2;

/// Largest code a 12-bit converter can return.
pub const ADC_MAX_CODE: u16 = 4095;

/// Smallest code a converter can return.
pub const ADC_MIN_CODE: u16 = 0;

/// Moving-average window (samples).
///
/// Five samples at 100 ms cover half a second, long enough to flatten
/// switching noise without hiding real temperature movement.
pub const MOVING_AVERAGE_WINDOW: usize = 5;

/// Half-width of the deadband filter (codes).
///
/// Eight codes at 12 bits is roughly 0.2% of full scale, about the
/// peak-to-peak noise of an unshielded thermistor divider.
pub const HYSTERESIS_DELTA: u16 = 8;

/// Lower end of the declared physical range (°C).
pub const PHYSICAL_RANGE_MIN: f32 = -30.0;

/// Upper end of the declared physical range (°C).
pub const PHYSICAL_RANGE_MAX: f32 = 40.0;

const _: () = assert!(MOVING_AVERAGE_WINDOW > 0, "moving average needs at least one slot");
const _: () = assert!(HYSTERESIS_DELTA < ADC_MAX_CODE);
