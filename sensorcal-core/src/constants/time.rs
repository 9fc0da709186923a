//! Cadences and Wait Budgets
//!
//! All values in milliseconds.

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

/// Analog scheduler period.
///
/// 10 Hz polling; each tick walks every channel once.
pub const ANALOG_PERIOD_MS: u64 = 100;

/// Pulse consumer period.
///
/// One second is the shortest interval that still sees a pulse at the
/// slowest wind the cups register.
pub const PULSE_PERIOD_MS: u64 = MS_PER_SECOND;

/// Write-side budget for acquiring a snapshot guard.
///
/// Short enough that a stuck reader costs the scheduler at most a tenth of
/// its period.
pub const PUBLISH_TIMEOUT_MS: u64 = 10;

/// Default consumer wait budget for `get_value`.
pub const READ_TIMEOUT_MS: u64 = 100;

/// Guard acquisition attempts allowed per millisecond of wait budget.
///
/// Caps a bounded wait even when the clock does not advance, e.g. a tick
/// counter read with interrupts masked.
pub const GUARD_SPINS_PER_MS: u64 = 1_000;

const _: () = assert!(PUBLISH_TIMEOUT_MS < ANALOG_PERIOD_MS);
