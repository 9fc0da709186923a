//! Pulse Path Defaults
//!
//! A cup anemometer closes a reed contact once per revolution. The consumer
//! converts pulses-per-interval to km/h with a fixed factor.

/// km/h per pulse counted in one consumer interval.
pub const PULSE_SCALE_FACTOR: f32 = 0.1;

/// Lowest plausible rate (km/h).
pub const PULSE_RATE_MIN: f32 = 0.0;

/// Highest plausible rate (km/h).
///
/// Anything faster is a bouncing contact or wiring fault, not wind.
pub const PULSE_RATE_MAX: f32 = 100.0;

/// GPIO the anemometer contact is wired to.
pub const PULSE_GPIO: u8 = 17;
