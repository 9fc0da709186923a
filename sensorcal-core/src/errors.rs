//! Error Types for Acquisition, Calibration and Publishing
//!
//! ## Design Philosophy
//!
//! Nothing in the engine is fatal to the process. Every failure degrades to
//! "keep the last known good value" plus a counter increment, so the error
//! types exist to tell the caller *which* counter moved and why:
//!
//! 1. **Small and `Copy`**: errors travel out of the scheduler tick and may be
//!    stored in status snapshots, so they carry no heap data.
//!
//! 2. **Local**: an error names the channel or quantity it belongs to. One
//!    channel's failure never halts the scheduler or another channel.
//!
//! ## Error Categories
//!
//! | Type | Meaning | Engine reaction |
//! |------|---------|-----------------|
//! | [`AcquisitionError`] | hardware read failed | error counter + 1, published value kept |
//! | [`CalibrationError`] | model not valid / bad anchor | publishing suppressed |
//! | [`PersistenceError`] | calibration store read/write failed | calibration treated as unset |
//! | [`PublishError`] | snapshot guard busy past the write budget | update dropped, contention counter + 1 |
//! | [`SnapshotError`] | consumer wait budget expired | caller gets no value, never partial data |
//! | [`ConfigError`] | configuration rejected at start-up | engine not constructed |
//!
//! [`EngineError`] wraps all of them at the channel and scheduler surface.
//!
//! ## Handling Example
//!
//! ```rust
//! use sensorcal_core::errors::{AcquisitionError, EngineError};
//!
//! fn on_tick_error(err: EngineError) {
//!     match err {
//!         EngineError::Acquisition(AcquisitionError::Hardware { .. }) => {
//!             // transient; the stale value stays published
//!         }
//!         EngineError::Publish(_) => {
//!             // next tick retries naturally
//!         }
//!         _ => {}
//!     }
//! }
//! # on_tick_error(EngineError::UnknownChannel { channel: 9, count: 2 });
//! ```

use thiserror_no_std::Error;

use crate::calibration::PointId;
use crate::hal::{ChannelId, HardwareError};

/// Result of a hardware acquisition
pub type AcquisitionResult<T> = Result<T, AcquisitionError>;

/// Result of a calibration operation
pub type CalibrationResult<T> = Result<T, CalibrationError>;

/// Result at the channel / scheduler surface
pub type EngineResult<T> = Result<T, EngineError>;

/// Failure to obtain a raw sample from the converter
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionError {
    /// The read primitive reported a platform error
    #[error("channel {channel}: hardware read failed (code {code})")]
    Hardware {
        /// Channel that was being read
        channel: ChannelId,
        /// Platform-specific error code
        code: i32,
    },

    /// Conversion still pending when the tick ran
    #[error("channel {channel}: conversion not ready")]
    NotReady {
        /// Channel that was being read
        channel: ChannelId,
    },

    /// Converter returned a code above the device maximum
    #[error("channel {channel}: code {code} above device max {max}")]
    CodeOutOfRange {
        /// Channel that was being read
        channel: ChannelId,
        /// Code returned by the converter
        code: u16,
        /// Largest code the device can produce
        max: u16,
    },
}

impl AcquisitionError {
    /// Classify a failed non-blocking read of `channel`
    pub fn from_read(channel: ChannelId, err: nb::Error<HardwareError>) -> Self {
        match err {
            nb::Error::WouldBlock => Self::NotReady { channel },
            nb::Error::Other(hw) => Self::Hardware { channel, code: hw.code },
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AcquisitionError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Hardware { channel, code } =>
                defmt::write!(fmt, "ch{}: hardware error {}", channel, code),
            Self::NotReady { channel } =>
                defmt::write!(fmt, "ch{}: not ready", channel),
            Self::CodeOutOfRange { channel, code, max } =>
                defmt::write!(fmt, "ch{}: code {} > {}", channel, code, max),
        }
    }
}

/// Calibration model errors
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum CalibrationError {
    /// Physical value outside the device-declared range
    #[error("value {value} outside range [{min}, {max}]")]
    ValueOutOfRange {
        /// Rejected physical value
        value: f32,
        /// Lower end of the declared range
        min: f32,
        /// Upper end of the declared range
        max: f32,
    },

    /// Raw code above the converter's maximum
    #[error("code {code} above device max {max}")]
    CodeOutOfRange {
        /// Rejected raw code
        code: u16,
        /// Largest valid code
        max: u16,
    },

    /// Anchor codes are not strictly increasing
    #[error("code1 ({code1}) must be greater than code0 ({code0})")]
    NonIncreasingCodes {
        /// Code of anchor 0
        code0: u16,
        /// Code of anchor 1
        code1: u16,
    },

    /// Anchor values are not strictly increasing
    #[error("value1 ({value1}) must be greater than value0 ({value0})")]
    NonIncreasingValues {
        /// Physical value of anchor 0
        value0: f32,
        /// Physical value of anchor 1
        value1: f32,
    },

    /// An anchor has never been set (or could not be restored)
    #[error("calibration point {point} missing")]
    MissingPoint {
        /// Which anchor is missing
        point: PointId,
    },

    /// The anchors were written in different calibration sessions
    #[error("calibration point {point} belongs to an earlier session")]
    StalePoint {
        /// The older anchor
        point: PointId,
    },

    /// Physical value is NaN or infinite
    #[error("value is not a finite number")]
    NotFinite,

    /// The model has not been validated by a successful recompute
    #[error("calibration model is not valid")]
    Invalid,
}

#[cfg(feature = "defmt")]
impl defmt::Format for CalibrationError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ValueOutOfRange { value, min, max } =>
                defmt::write!(fmt, "value {} outside [{}, {}]", value, min, max),
            Self::CodeOutOfRange { code, max } =>
                defmt::write!(fmt, "code {} > {}", code, max),
            Self::NonIncreasingCodes { code0, code1 } =>
                defmt::write!(fmt, "code1 {} <= code0 {}", code1, code0),
            Self::NonIncreasingValues { value0, value1 } =>
                defmt::write!(fmt, "value1 {} <= value0 {}", value1, value0),
            Self::MissingPoint { point } =>
                defmt::write!(fmt, "point {} missing", point),
            Self::StalePoint { point } =>
                defmt::write!(fmt, "point {} stale", point),
            Self::NotFinite =>
                defmt::write!(fmt, "value not finite"),
            Self::Invalid =>
                defmt::write!(fmt, "model invalid"),
        }
    }
}

/// Calibration store failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistenceError {
    /// Key has never been written
    #[error("key not found")]
    NotFound,
    /// Backend failed while reading
    #[error("read failed")]
    Read,
    /// Backend failed while writing
    #[error("write failed")]
    Write,
    /// Stored bytes could not be decoded
    #[error("stored record is corrupt")]
    Corrupt,
}

/// Write-side snapshot failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishError {
    /// Guard not acquired within the write budget; update dropped
    #[error("snapshot slot contended, update dropped")]
    Contention,
    /// No slot exists for the quantity
    #[error("no snapshot slot for this quantity")]
    UnknownQuantity,
}

/// Read-side snapshot failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SnapshotError {
    /// Wait budget expired before the guard was acquired
    #[error("snapshot unavailable within wait budget")]
    Unavailable,
    /// Guard acquired but nothing has been published yet
    #[error("no value published yet")]
    Empty,
    /// No slot exists for the quantity
    #[error("no snapshot slot for this quantity")]
    UnknownQuantity,
}

/// Configuration rejected at construction
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A periodic driver was given a zero period
    #[error("{name} must be greater than zero")]
    ZeroPeriod {
        /// Offending field
        name: &'static str,
    },
    /// Physical range is empty or not finite
    #[error("range [{min}, {max}] is empty")]
    EmptyRange {
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
    },
    /// Hysteresis half-width does not fit the code range
    #[error("hysteresis delta {delta} must be below max code {max_code}")]
    DeltaTooWide {
        /// Configured half-width
        delta: u16,
        /// Device maximum code
        max_code: u16,
    },
    /// Pulse scale factor is zero, negative or not finite
    #[error("pulse scale factor {factor} must be positive")]
    BadScaleFactor {
        /// Configured factor
        factor: f32,
    },
}

/// Umbrella error for channel and scheduler operations
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineError {
    /// Channel index outside `[0, count)`
    #[error("unknown channel {channel} (channel count {count})")]
    UnknownChannel {
        /// Requested channel
        channel: ChannelId,
        /// Number of configured channels
        count: usize,
    },

    /// Hardware acquisition failed
    #[error("acquisition failed: {0}")]
    Acquisition(AcquisitionError),

    /// Calibration rejected or model invalid
    #[error("calibration: {0}")]
    Calibration(CalibrationError),

    /// Calibration store failed
    #[error("persistence: {0}")]
    Persistence(PersistenceError),

    /// Snapshot write dropped
    #[error("publish: {0}")]
    Publish(PublishError),

    /// Derived rate outside the plausible range; not published
    #[error("rate {rate} outside plausible range [{min}, {max}]")]
    RateOutOfRange {
        /// Computed rate
        rate: f32,
        /// Lower plausibility bound
        min: f32,
        /// Upper plausibility bound
        max: f32,
    },
}

impl From<AcquisitionError> for EngineError {
    fn from(err: AcquisitionError) -> Self {
        Self::Acquisition(err)
    }
}

impl From<CalibrationError> for EngineError {
    fn from(err: CalibrationError) -> Self {
        Self::Calibration(err)
    }
}

impl From<PersistenceError> for EngineError {
    fn from(err: PersistenceError) -> Self {
        Self::Persistence(err)
    }
}

impl From<PublishError> for EngineError {
    fn from(err: PublishError) -> Self {
        Self::Publish(err)
    }
}
